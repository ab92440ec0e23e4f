//! Client-side state containers.
//!
//! Every store keeps its state behind a `RefCell`, exposes `&self` methods
//! and is shared through `Rc`.  Borrows are released before any `.await`.

pub mod agent;
pub mod brand;
pub mod entity;
pub mod execution;
pub mod loading;
pub mod notification;
pub mod session;
pub mod settings;
pub mod stats;
pub mod theme;
pub mod workflow;

pub use agent::{AgentFilters, AgentStore};
pub use brand::{BrandInfo, BrandStore};
pub use entity::{EntityStore, Filters, ListResource, Pagination};
pub use execution::{ExecutionFilters, ExecutionStore};
pub use loading::LoadingStore;
pub use notification::{Notification, NotificationKind, NotificationStore};
pub use session::SessionStore;
pub use settings::SettingsStore;
pub use stats::StatsStore;
pub use theme::ThemeStore;
pub use workflow::{WorkflowFilters, WorkflowStore};

#[cfg(test)]
pub(crate) mod test_support {
    use std::rc::Rc;

    use crate::network::{ApiClient, ApiConfig, ScriptedTransport};
    use crate::scheduling::ManualClock;
    use crate::storage::{MemoryStore, SessionStorage, SharedStore};
    use crate::stores::notification::NotificationStore;

    /// A client wired to a scripted transport and in-memory storage.
    pub struct Harness {
        pub transport: Rc<ScriptedTransport>,
        pub client: Rc<ApiClient>,
        pub store: SharedStore,
        pub notifications: Rc<NotificationStore>,
    }

    impl Harness {
        pub fn new() -> Self {
            let transport = Rc::new(ScriptedTransport::new());
            let store: SharedStore = Rc::new(MemoryStore::new());
            let notifications = Rc::new(NotificationStore::new(Rc::new(ManualClock::new(0))));
            let client = Rc::new(ApiClient::new(
                ApiConfig::from_url("/api"),
                transport.clone(),
                SessionStorage::new(store.clone()),
                notifications.clone(),
            ));
            Self {
                transport,
                client,
                store,
                notifications,
            }
        }
    }
}
