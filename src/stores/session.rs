//! The signed-in user.
//!
//! Token and profile live in [`SessionStorage`] so a reload can rehydrate
//! them.  Settings are synced by the composition root after login; this
//! store never reaches for them.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::error::ApiError;
use crate::models::{AuthResponse, Credentials, PasswordChange, RegisterRequest, UserProfile};
use crate::network::api::{auth, users};
use crate::network::transport::FilePart;
use crate::network::ApiClient;
use crate::storage::SessionStorage;

#[derive(Debug, Clone, Default, PartialEq)]
struct SessionState {
    user: Option<UserProfile>,
    token: Option<String>,
    loading: bool,
    error: Option<String>,
}

pub struct SessionStore {
    client: Rc<ApiClient>,
    uploads: ApiClient,
    state: RefCell<SessionState>,
}

impl SessionStore {
    pub fn new(client: Rc<ApiClient>) -> Self {
        let uploads = client.for_uploads();
        Self {
            client,
            uploads,
            state: RefCell::new(SessionState::default()),
        }
    }

    fn storage(&self) -> &SessionStorage {
        self.client.session()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.state
            .borrow()
            .user
            .as_ref()
            .is_some_and(UserProfile::is_admin)
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    fn begin(&self) {
        let mut state = self.state.borrow_mut();
        state.loading = true;
        state.error = None;
    }

    fn fail(&self, err: ApiError, fallback: &str) -> ApiError {
        log::error!("{}: {}", fallback, err);
        let mut state = self.state.borrow_mut();
        state.loading = false;
        state.error = Some(err.message_or(fallback));
        err
    }

    fn establish(&self, auth: &AuthResponse) {
        if let Err(e) = self.storage().save(&auth.token, &auth.user) {
            log::warn!("failed to persist session: {}", e);
        }
        let mut state = self.state.borrow_mut();
        state.token = Some(auth.token.clone());
        state.user = Some(auth.user.clone());
        state.loading = false;
    }

    fn teardown(&self) {
        self.storage().clear();
        let mut state = self.state.borrow_mut();
        state.token = None;
        state.user = None;
    }

    fn persist_user(&self, user: &UserProfile) {
        if let Err(e) = self.storage().save_user(user) {
            log::warn!("failed to persist user: {}", e);
        }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, ApiError> {
        self.begin();
        match auth::login(&self.client, credentials).await {
            Ok(auth) => {
                self.establish(&auth);
                log::info!("signed in as {}", auth.user.username);
                Ok(auth.user)
            }
            Err(err) => Err(self.fail(err, "登录失败")),
        }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ApiError> {
        self.begin();
        match auth::register(&self.client, request).await {
            Ok(auth) => {
                self.establish(&auth);
                Ok(auth.user)
            }
            Err(err) => Err(self.fail(err, "注册失败")),
        }
    }

    /// Best effort on the server; the local session always ends.
    pub async fn logout(&self) {
        self.state.borrow_mut().loading = true;
        if let Err(err) = auth::logout(&self.client).await {
            log::error!("logout request failed: {}", err);
        }
        self.teardown();
        self.state.borrow_mut().loading = false;
    }

    /// Refresh the profile.  Without a token this does nothing and returns
    /// `Ok(None)`; a failure ends the session.
    pub async fn fetch_profile(&self) -> Result<Option<UserProfile>, ApiError> {
        if !self.storage().has_token() {
            return Ok(None);
        }
        self.begin();
        match users::get_profile(&self.client).await {
            Ok(user) => {
                self.persist_user(&user);
                let mut state = self.state.borrow_mut();
                state.user = Some(user.clone());
                state.loading = false;
                Ok(Some(user))
            }
            Err(err) => {
                let err = self.fail(err, "获取用户信息失败");
                self.teardown();
                Err(err)
            }
        }
    }

    /// Sends `patch`, merges whatever the server echoes back into the
    /// current user and persists the result.
    pub async fn update_profile(&self, patch: &Value) -> Result<Option<UserProfile>, ApiError> {
        self.begin();
        match users::update_profile(&self.client, patch).await {
            Ok(echo) => Ok(self.merge_user(&echo)),
            Err(err) => Err(self.fail(err, "更新用户信息失败")),
        }
    }

    fn merge_user(&self, patch: &Value) -> Option<UserProfile> {
        let merged = {
            let mut state = self.state.borrow_mut();
            state.loading = false;
            let user = state.user.as_mut()?;
            if let Err(e) = user.merge(patch) {
                log::warn!("ignoring malformed profile update: {}", e);
            }
            user.clone()
        };
        self.persist_user(&merged);
        Some(merged)
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        self.begin();
        match users::change_password(&self.client, change).await {
            Ok(()) => {
                self.state.borrow_mut().loading = false;
                Ok(())
            }
            Err(err) => Err(self.fail(err, "修改密码失败")),
        }
    }

    /// Uploads through the multipart client and records the new avatar URL
    /// (`avatar` or `url` field of the reply) on the current user.
    pub async fn upload_avatar(&self, file: FilePart) -> Result<Option<String>, ApiError> {
        self.begin();
        match users::upload_avatar(&self.uploads, file).await {
            Ok(reply) => {
                let url = ["avatar", "url"]
                    .iter()
                    .find_map(|key| reply.get(key).and_then(Value::as_str))
                    .map(str::to_string);
                match &url {
                    Some(url) => {
                        self.merge_user(&serde_json::json!({ "avatar": url }));
                    }
                    None => self.state.borrow_mut().loading = false,
                }
                Ok(url)
            }
            Err(err) => Err(self.fail(err, "上传头像失败")),
        }
    }

    /// Reconcile memory with storage: rehydrate when only storage holds a
    /// token, forget the user when storage lost it (a 401 elsewhere).
    /// Returns whether a session is active afterwards.
    pub fn sync_with_storage(&self) -> bool {
        if self.storage().has_token() {
            if !self.is_authenticated() {
                self.initialize_from_storage();
            }
        } else if self.is_authenticated() {
            let mut state = self.state.borrow_mut();
            state.token = None;
            state.user = None;
        }
        self.is_authenticated()
    }

    /// Rehydrate from storage.  The token alone makes a session; a missing
    /// `user` entry is left for [`Self::fetch_profile`], a corrupt one wipes
    /// the session.  Returns whether a session was restored.
    pub fn initialize_from_storage(&self) -> bool {
        let Some(token) = self.storage().token() else {
            return false;
        };
        match self.storage().user() {
            Ok(user) => {
                let mut state = self.state.borrow_mut();
                state.token = Some(token);
                state.user = user;
                true
            }
            Err(e) => {
                log::warn!("discarding stored session: {}", e);
                self.teardown();
                false
            }
        }
    }
}
