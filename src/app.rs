//! Composition root: builds every store once and wires the cross-store
//! flows (settings refresh after login, login redirect on 401).

use std::rc::Rc;

use crate::error::ApiError;
use crate::models::{Credentials, RegisterRequest, UserProfile};
use crate::network::{ApiClient, ApiConfig, HttpTransport, Navigator};
use crate::router::{History, Router, LOGIN_PATH};
use crate::scheduling::Clock;
use crate::storage::{SessionStorage, SharedStore};
use crate::stores::{
    AgentStore, BrandStore, ExecutionStore, LoadingStore, NotificationStore, SessionStore,
    SettingsStore, StatsStore, ThemeStore, WorkflowStore,
};

pub struct AppContext {
    pub clock: Rc<dyn Clock>,
    pub storage: SharedStore,
    pub client: Rc<ApiClient>,
    pub notifications: Rc<NotificationStore>,
    pub loading: Rc<LoadingStore>,
    pub session: Rc<SessionStore>,
    pub theme: Rc<ThemeStore>,
    pub settings: Rc<SettingsStore>,
    pub brand: Rc<BrandStore>,
    pub workflows: Rc<WorkflowStore>,
    pub executions: Rc<ExecutionStore>,
    pub agents: Rc<AgentStore>,
    pub stats: Rc<StatsStore>,
    pub router: Rc<Router>,
}

impl AppContext {
    pub fn new(
        config: ApiConfig,
        transport: Rc<dyn HttpTransport>,
        storage: SharedStore,
        clock: Rc<dyn Clock>,
        history: Rc<dyn History>,
    ) -> Self {
        let notifications = Rc::new(NotificationStore::new(clock.clone()));
        let client = Rc::new(ApiClient::new(
            config,
            transport,
            SessionStorage::new(storage.clone()),
            notifications.clone(),
        ));
        let session = Rc::new(SessionStore::new(client.clone()));
        let router = Rc::new(Router::new(session.clone(), history));
        client.set_navigator(router.clone() as Rc<dyn Navigator>);

        let theme = Rc::new(ThemeStore::new(storage.clone()));
        let settings = Rc::new(SettingsStore::new(client.clone(), storage.clone(), theme.clone()));

        Self {
            loading: Rc::new(LoadingStore::new(clock.clone())),
            brand: Rc::new(BrandStore::new(clock.clone())),
            workflows: Rc::new(WorkflowStore::new(client.clone())),
            executions: Rc::new(ExecutionStore::new(client.clone())),
            agents: Rc::new(AgentStore::new(client.clone())),
            stats: Rc::new(StatsStore::new(client.clone(), clock.clone())),
            clock,
            storage,
            client,
            notifications,
            session,
            theme,
            settings,
            router,
        }
    }

    /// Wired to `fetch`, `localStorage` and `window.history`.
    #[cfg(target_arch = "wasm32")]
    pub fn browser() -> Self {
        Self::new(
            ApiConfig::default(),
            Rc::new(crate::network::FetchTransport),
            crate::storage::default_store(),
            Rc::new(crate::scheduling::SystemClock),
            Rc::new(crate::router::BrowserHistory),
        )
    }

    /// Restore persisted state and guard the first location.
    pub fn initialize(&self) {
        self.settings.load_from_storage();
        self.session.initialize_from_storage();
        self.router.start();
    }

    /// Fire due timers.  Returns how many transitions happened.
    pub fn tick(&self) -> usize {
        self.notifications.tick() + self.loading.tick()
    }

    /// One shell tick: fire due timers and take the current OS colour
    /// scheme.  Returns the new revision when the shell must re-render
    /// since `seen`.
    pub fn poll(&self, system_dark: bool, seen: u64) -> Option<u64> {
        self.tick();
        self.theme.set_system_dark_mode(system_dark);
        let revision = self.revision();
        (revision != seen).then_some(revision)
    }

    /// Grows whenever anything the shell renders has changed.
    pub fn revision(&self) -> u64 {
        [
            self.notifications.revision(),
            self.loading.revision(),
            self.theme.revision(),
            self.settings.revision(),
            self.router.revision(),
        ]
        .iter()
        .fold(0u64, |acc, r| acc.wrapping_add(*r))
    }

    /// Sign in, pull the user's settings (best effort) and continue to the
    /// page that sent the user to login.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, ApiError> {
        let user = self.session.login(credentials).await?;
        self.after_sign_in().await;
        Ok(user)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ApiError> {
        let user = self.session.register(request).await?;
        self.after_sign_in().await;
        Ok(user)
    }

    async fn after_sign_in(&self) {
        if let Err(err) = self.settings.fetch_settings().await {
            log::warn!("settings sync after login failed: {}", err);
        }
        let target = self.router.after_login_target();
        self.router.push(&target);
    }

    pub async fn logout(&self) {
        self.session.logout().await;
        self.router.push(LOGIN_PATH);
    }
}
