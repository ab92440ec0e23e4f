use std::cell::RefCell;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::config::ApiConfig;
use super::transport::{FilePart, HttpMethod, HttpRequest, HttpTransport, RequestBody};
use crate::constants::ERROR_DURATION_MS;
use crate::error::{ApiError, StatusClass, DECODE_MESSAGE, GENERIC_FAILURE_MESSAGE};
use crate::models::decode_body;
use crate::storage::SessionStorage;
use crate::stores::notification::{NotificationKind, NotificationStore};

/// Shown when a 401 ends the session.
pub const SESSION_EXPIRED_MESSAGE: &str = "登录已过期，请重新登录";

/// Query string pairs, in the order they are sent.
pub type Query = Vec<(String, String)>;

/// What the client needs from the router to send the user back to login.
pub trait Navigator {
    /// Path plus query string of the current route.
    fn current_full_path(&self) -> String;
    fn is_login_route(&self) -> bool;
    /// Go to the login page, remembering where to come back to.
    fn to_login(&self, redirect: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailurePolicy {
    /// Full interceptor: session teardown on 401, status-labelled toasts.
    Interactive,
    /// "上传失败: ..." toast only.
    Upload,
}

// ----------------------------------------------------------------------------
// REST client
// ----------------------------------------------------------------------------

/// REST client shared by every API module.
///
/// Requests carry the persisted bearer token; responses are decoded through
/// [`decode_body`].  On failure the client performs its global side effects
/// (toast, session teardown, login redirect) and then still returns the
/// error so the calling store can record it.
pub struct ApiClient {
    config: ApiConfig,
    transport: Rc<dyn HttpTransport>,
    session: SessionStorage,
    notifications: Rc<NotificationStore>,
    navigator: RefCell<Option<Rc<dyn Navigator>>>,
    policy: FailurePolicy,
}

impl ApiClient {
    pub fn new(
        config: ApiConfig,
        transport: Rc<dyn HttpTransport>,
        session: SessionStorage,
        notifications: Rc<NotificationStore>,
    ) -> Self {
        Self {
            config,
            transport,
            session,
            notifications,
            navigator: RefCell::new(None),
            policy: FailurePolicy::Interactive,
        }
    }

    /// Sibling client for multipart uploads: longer timeout, no JSON
    /// content-type and the simpler upload failure toast.
    pub fn for_uploads(&self) -> Self {
        Self {
            config: self.config.for_uploads(),
            transport: self.transport.clone(),
            session: self.session.clone(),
            notifications: self.notifications.clone(),
            navigator: RefCell::new(None),
            policy: FailurePolicy::Upload,
        }
    }

    /// The router is built after the client, so it is attached late.
    pub fn set_navigator(&self, navigator: Rc<dyn Navigator>) {
        *self.navigator.borrow_mut() = Some(navigator);
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStorage {
        &self.session
    }

    // ---------------- Verbs ----------------

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> Result<T, ApiError> {
        let request = self.request(HttpMethod::Get, path, query, None);
        self.execute(request).await
    }

    pub async fn post<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.json_body(body)?;
        let request = self.request(HttpMethod::Post, path, &[], body);
        self.execute(request).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.json_body(Some(body))?;
        let request = self.request(HttpMethod::Put, path, &[], body);
        self.execute(request).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.request(HttpMethod::Delete, path, &[], None);
        self.execute(request).await
    }

    /// POST a multipart form.
    pub async fn upload<T: DeserializeOwned>(&self, path: &str, parts: Vec<FilePart>) -> Result<T, ApiError> {
        let request = self.request(HttpMethod::Post, path, &[], Some(RequestBody::Multipart(parts)));
        self.execute(request).await
    }

    // ---------------- Request side ----------------

    fn json_body<B: Serialize + ?Sized>(&self, body: Option<&B>) -> Result<Option<RequestBody>, ApiError> {
        body.map(|b| {
            serde_json::to_string(b)
                .map(RequestBody::Json)
                .map_err(|e| ApiError::Encode(e.to_string()))
        })
        .transpose()
    }

    fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(String, String)],
        body: Option<RequestBody>,
    ) -> HttpRequest {
        let mut url = self.config.url(path);
        if !query.is_empty() {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query.iter())
                .finish();
            url.push('?');
            url.push_str(&encoded);
        }

        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if self.policy == FailurePolicy::Interactive {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        if let Some(token) = self.session.token() {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        HttpRequest {
            method,
            url,
            headers,
            body,
            timeout_ms: self.config.timeout_ms(),
        }
    }

    // ---------------- Response side ----------------

    async fn execute<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, ApiError> {
        let method = request.method;
        let url = request.url.clone();

        let error = match self.transport.send(request).await {
            Ok(response) if response.is_success() => match decode_body(&response.body) {
                Ok(value) => return Ok(value),
                Err(e) => ApiError::Decode(e.to_string()),
            },
            Ok(response) => ApiError::http(response.status, server_message(&response.body)),
            Err(failure) => ApiError::from_transport_text(&failure.message),
        };

        log::warn!("{} {} failed: {:?}", method.as_str(), url, error);
        self.report(&error);
        Err(error)
    }

    fn report(&self, error: &ApiError) {
        if self.policy == FailurePolicy::Upload {
            self.notifications
                .error(&format!("上传失败: {}", error.user_message()));
            return;
        }

        match error {
            ApiError::Http {
                class: StatusClass::Unauthorized,
                ..
            } => self.end_session(),
            ApiError::Http { class, message, .. } => {
                let text = message.as_deref().unwrap_or(GENERIC_FAILURE_MESSAGE);
                self.notifications
                    .add(NotificationKind::Error, class.label(), text, ERROR_DURATION_MS);
            }
            ApiError::Timeout(_) | ApiError::Network(_) => {
                self.notifications.error(&error.user_message());
            }
            ApiError::Decode(_) | ApiError::Encode(_) => {
                self.notifications.error(DECODE_MESSAGE);
            }
        }
    }

    fn end_session(&self) {
        self.session.clear();
        // Clone out so the navigator may call back into this client.
        let navigator = self.navigator.borrow().clone();
        if let Some(navigator) = navigator {
            if !navigator.is_login_route() {
                let redirect = navigator.current_full_path();
                navigator.to_login(&redirect);
            }
        }
        self.notifications.warning(SESSION_EXPIRED_MESSAGE);
    }
}

/// `message` (or `error`) field of an error body, if it has one.
fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .find(|text| !text.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_UPLOAD_TIMEOUT_MS, TOKEN_KEY};
    use crate::error::{NETWORK_MESSAGE, TIMEOUT_MESSAGE};
    use crate::models::{ListResponse, Workflow};
    use crate::network::transport::ScriptedTransport;
    use crate::scheduling::ManualClock;
    use crate::storage::{KeyValueStore, MemoryStore, SharedStore};
    use futures::executor::block_on;
    use serde_json::{json, Value};
    use std::cell::Cell;

    struct FakeNavigator {
        path: String,
        on_login: bool,
        pushed: RefCell<Vec<String>>,
        calls: Cell<usize>,
    }

    impl FakeNavigator {
        fn at(path: &str, on_login: bool) -> Rc<Self> {
            Rc::new(Self {
                path: path.to_string(),
                on_login,
                pushed: RefCell::new(Vec::new()),
                calls: Cell::new(0),
            })
        }
    }

    impl Navigator for FakeNavigator {
        fn current_full_path(&self) -> String {
            self.path.clone()
        }

        fn is_login_route(&self) -> bool {
            self.on_login
        }

        fn to_login(&self, redirect: &str) {
            self.calls.set(self.calls.get() + 1);
            self.pushed.borrow_mut().push(redirect.to_string());
        }
    }

    struct Fixture {
        transport: Rc<ScriptedTransport>,
        store: SharedStore,
        notifications: Rc<NotificationStore>,
        client: ApiClient,
    }

    fn fixture() -> Fixture {
        let transport = Rc::new(ScriptedTransport::new());
        let store: SharedStore = Rc::new(MemoryStore::new());
        let notifications = Rc::new(NotificationStore::new(Rc::new(ManualClock::new(0))));
        let client = ApiClient::new(
            ApiConfig::from_url("/api"),
            transport.clone(),
            SessionStorage::new(store.clone()),
            notifications.clone(),
        );
        Fixture {
            transport,
            store,
            notifications,
            client,
        }
    }

    #[test]
    fn attaches_bearer_token_and_encodes_query() {
        let f = fixture();
        f.store.set(TOKEN_KEY, "abc").unwrap();
        f.transport
            .push_json(200, json!({"data": [{"id": 1, "name": "w"}], "total": 1}));

        let query = vec![
            ("limit".to_string(), "10".to_string()),
            ("search".to_string(), "a b".to_string()),
        ];
        let page: ListResponse<Workflow> = block_on(f.client.get("/workflows", &query)).unwrap();
        assert_eq!(page.total, 1);

        let sent = f.transport.last_request().unwrap();
        assert_eq!(sent.url, "/api/workflows?limit=10&search=a+b");
        assert_eq!(sent.header("authorization"), Some("Bearer abc"));
        assert_eq!(sent.header("content-type"), Some("application/json"));
        assert_eq!(sent.timeout_ms, f.client.config().timeout_ms());
    }

    #[test]
    fn unauthorized_clears_session_and_redirects() {
        let f = fixture();
        let navigator = FakeNavigator::at("/workflows/5?tab=logs", false);
        f.client.set_navigator(navigator.clone());
        f.store.set(TOKEN_KEY, "stale").unwrap();
        f.transport.push_json(401, json!({"message": "token expired"}));

        let err = block_on(f.client.get::<Value>("/users/profile", &[])).unwrap_err();
        assert!(err.is_unauthorized());
        assert!(f.store.get(TOKEN_KEY).is_none());
        assert_eq!(*navigator.pushed.borrow(), vec!["/workflows/5?tab=logs".to_string()]);

        let toast = &f.notifications.notifications()[0];
        assert_eq!(toast.kind, NotificationKind::Warning);
        assert_eq!(toast.message, SESSION_EXPIRED_MESSAGE);
    }

    #[test]
    fn unauthorized_on_login_page_does_not_redirect() {
        let f = fixture();
        let navigator = FakeNavigator::at("/auth/login", true);
        f.client.set_navigator(navigator.clone());
        f.transport.push_response(401, "");

        let _ = block_on(f.client.post::<Value, Value>("/auth/login", None));
        assert_eq!(navigator.calls.get(), 0);
    }

    #[test]
    fn status_errors_use_label_and_server_message() {
        let f = fixture();
        f.transport.push_json(404, json!({"error": "workflow 9 not found"}));
        f.transport.push_response(500, "<html>oops</html>");

        let err = block_on(f.client.get::<Value>("/workflows/9", &[])).unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.user_message(), "workflow 9 not found");

        let _ = block_on(f.client.delete::<Value>("/workflows/1"));

        let toasts = f.notifications.notifications();
        assert_eq!(toasts[0].title, "服务器内部错误");
        assert_eq!(toasts[0].message, GENERIC_FAILURE_MESSAGE);
        assert_eq!(toasts[1].title, "请求的资源不存在");
        assert_eq!(toasts[1].message, "workflow 9 not found");
    }

    #[test]
    fn network_failures_are_classified() {
        let f = fixture();
        f.transport.push_failure("timeout of 30000ms exceeded");
        f.transport.push_failure("Failed to fetch");

        let first = block_on(f.client.get::<Value>("/stats/dashboard", &[])).unwrap_err();
        let second = block_on(f.client.get::<Value>("/stats/dashboard", &[])).unwrap_err();
        assert!(matches!(first, ApiError::Timeout(_)));
        assert!(matches!(second, ApiError::Network(_)));

        let messages: Vec<String> = f
            .notifications
            .notifications()
            .into_iter()
            .map(|n| n.message)
            .collect();
        assert_eq!(messages, vec![NETWORK_MESSAGE, TIMEOUT_MESSAGE]);
    }

    #[test]
    fn upload_client_has_own_policy() {
        let f = fixture();
        let navigator = FakeNavigator::at("/profile", false);
        f.client.set_navigator(navigator.clone());
        f.store.set(TOKEN_KEY, "abc").unwrap();
        let uploads = f.client.for_uploads();
        f.transport.push_json(401, json!({"message": "nope"}));

        let part = FilePart {
            field: "avatar".into(),
            file_name: "me.png".into(),
            mime_type: "image/png".into(),
            bytes: vec![1, 2, 3],
        };
        let err = block_on(uploads.upload::<Value>("/users/avatar", vec![part])).unwrap_err();
        assert!(err.is_unauthorized());

        let sent = f.transport.last_request().unwrap();
        assert_eq!(sent.timeout_ms, DEFAULT_UPLOAD_TIMEOUT_MS);
        assert_eq!(sent.header("content-type"), None);
        assert_eq!(sent.header("authorization"), Some("Bearer abc"));
        assert!(matches!(sent.body, Some(RequestBody::Multipart(_))));

        assert_eq!(navigator.calls.get(), 0);
        assert_eq!(f.store.get(TOKEN_KEY).as_deref(), Some("abc"));
        assert_eq!(f.notifications.notifications()[0].message, "上传失败: nope");
    }

    #[test]
    fn empty_success_body_decodes_as_unit() {
        let f = fixture();
        f.transport.push_response(204, "");
        let result: Result<(), ApiError> = block_on(f.client.delete("/agents/3"));
        assert!(result.is_ok());
        assert!(f.notifications.is_empty());
    }

    #[test]
    fn malformed_success_body_is_a_decode_error() {
        let f = fixture();
        f.transport.push_response(200, "{truncated");
        let err = block_on(f.client.get::<Workflow>("/workflows/1", &[])).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        assert_eq!(f.notifications.notifications()[0].message, DECODE_MESSAGE);
    }
}
