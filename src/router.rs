//! Client-side routes, the authentication guard and browser history.
//!
//! Every navigation resolves the target against [`ROUTES`], runs the
//! guard and follows its redirect (bounded) before committing the final
//! location to history and the document title.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use url::form_urlencoded;

use crate::constants::BRAND_NAME;
use crate::network::Navigator;
use crate::stores::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDef {
    pub name: &'static str,
    /// `/`-separated segments; `:name` captures one segment.
    pub pattern: &'static str,
    pub aliases: &'static [&'static str],
    pub title: &'static str,
    pub requires_auth: bool,
    /// Only for signed-out visitors (login, register).
    pub guest: bool,
}

const fn page(name: &'static str, pattern: &'static str, title: &'static str) -> RouteDef {
    RouteDef {
        name,
        pattern,
        aliases: &[],
        title,
        requires_auth: true,
        guest: false,
    }
}

pub const LOGIN_ROUTE: &str = "login";
pub const LOGIN_PATH: &str = "/auth/login";
pub const LANDING_PATH: &str = "/";

/// Matched top to bottom; more specific patterns come first.
pub const ROUTES: &[RouteDef] = &[
    page("dashboard", "/", "仪表盘"),
    page("workflows", "/workflows", "工作流管理"),
    page("workflow-create", "/workflows/create", "创建工作流"),
    page("workflow-detail", "/workflows/:id", "工作流详情"),
    page("workflow-execute", "/workflows/:id/execute", "执行工作流"),
    page("executions", "/executions", "执行历史"),
    page("agents", "/agents", "代理管理"),
    page("agent-detail", "/agents/:id", "代理详情"),
    page("stats", "/stats", "统计分析"),
    page("profile", "/profile", "个人资料"),
    page("settings", "/settings", "系统设置"),
    page("help", "/help", "帮助中心"),
    RouteDef {
        name: LOGIN_ROUTE,
        pattern: LOGIN_PATH,
        aliases: &["/login"],
        title: "登录",
        requires_auth: false,
        guest: true,
    },
    RouteDef {
        name: "register",
        pattern: "/auth/register",
        aliases: &["/register"],
        title: "注册",
        requires_auth: false,
        guest: true,
    },
];

pub const NOT_FOUND: RouteDef = RouteDef {
    name: "not-found",
    pattern: "*",
    aliases: &[],
    title: "页面未找到",
    requires_auth: false,
    guest: false,
};

pub fn route_by_name(name: &str) -> Option<&'static RouteDef> {
    ROUTES.iter().find(|r| r.name == name)
}

/// A resolved location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub route: &'static RouteDef,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl RouteMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        lookup(&self.params, name)
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        lookup(&self.query, name)
    }

    /// Numeric `:id` parameter.
    pub fn id(&self) -> Option<i64> {
        self.param("id")?.parse().ok()
    }

    pub fn full_path(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{}", self.path, query)
    }

    /// `"<title> - JiLang Agent"`.
    pub fn document_title(&self) -> String {
        format!("{} - {}", self.route.title, BRAND_NAME)
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn match_pattern(pattern: &str, path: &[&str]) -> Option<Vec<(String, String)>> {
    let pattern = segments(pattern);
    if pattern.len() != path.len() {
        return None;
    }
    let mut params = Vec::new();
    for (want, got) in pattern.iter().zip(path) {
        match want.strip_prefix(':') {
            Some(name) => params.push((name.to_string(), (*got).to_string())),
            None if want == got => {}
            None => return None,
        }
    }
    Some(params)
}

/// Resolve `path[?query]`.  Unknown paths resolve to [`NOT_FOUND`].
pub fn resolve(full_path: &str) -> RouteMatch {
    let (raw_path, raw_query) = full_path.split_once('?').unwrap_or((full_path, ""));
    let query: Vec<(String, String)> = form_urlencoded::parse(raw_query.as_bytes())
        .into_owned()
        .collect();
    let parts = segments(raw_path);
    let path = format!("/{}", parts.join("/"));

    for route in ROUTES {
        let candidates = std::iter::once(route.pattern).chain(route.aliases.iter().copied());
        for pattern in candidates {
            if let Some(params) = match_pattern(pattern, &parts) {
                return RouteMatch {
                    route,
                    // Aliases are literal, so the canonical path is the pattern.
                    path: if pattern == route.pattern {
                        path
                    } else {
                        route.pattern.to_string()
                    },
                    params,
                    query,
                };
            }
        }
    }
    RouteMatch {
        route: &NOT_FOUND,
        path,
        params: Vec::new(),
        query,
    }
}

/// `/auth/login?redirect=<back_to>`.
pub fn login_path(back_to: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect", back_to)
        .finish();
    format!("{}?{}", LOGIN_PATH, query)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(String),
}

/// Decide a navigation for a known session state.
pub fn decide(target: &RouteMatch, authenticated: bool) -> GuardDecision {
    if target.route.requires_auth && !authenticated {
        GuardDecision::Redirect(login_path(&target.full_path()))
    } else if target.route.guest && authenticated {
        GuardDecision::Redirect(LANDING_PATH.to_string())
    } else {
        GuardDecision::Proceed
    }
}

/// The guard proper: restores the session lazily, then decides.
pub fn guard(target: &RouteMatch, session: &SessionStore) -> GuardDecision {
    decide(target, session.sync_with_storage())
}

/// Where the address bar and tab title live.
pub trait History {
    /// Path plus query the platform currently shows.
    fn location(&self) -> String;
    fn push(&self, full_path: &str);
    fn replace(&self, full_path: &str);
    fn set_title(&self, title: &str);
}

/// In-memory history for tests and non-browser hosts.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: RefCell<Vec<String>>,
    title: RefCell<String>,
}

impl MemoryHistory {
    pub fn new(initial: &str) -> Self {
        Self {
            entries: RefCell::new(vec![initial.to_string()]),
            title: RefCell::new(String::new()),
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    pub fn title(&self) -> String {
        self.title.borrow().clone()
    }
}

impl History for MemoryHistory {
    fn location(&self) -> String {
        self.entries
            .borrow()
            .last()
            .cloned()
            .unwrap_or_else(|| LANDING_PATH.to_string())
    }

    fn push(&self, full_path: &str) {
        self.entries.borrow_mut().push(full_path.to_string());
    }

    fn replace(&self, full_path: &str) {
        let mut entries = self.entries.borrow_mut();
        entries.pop();
        entries.push(full_path.to_string());
    }

    fn set_title(&self, title: &str) {
        *self.title.borrow_mut() = title.to_string();
    }
}

/// `window.history` plus `document.title`.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserHistory;

#[cfg(target_arch = "wasm32")]
impl History for BrowserHistory {
    fn location(&self) -> String {
        web_sys::window()
            .map(|w| w.location())
            .and_then(|l| Some(format!("{}{}", l.pathname().ok()?, l.search().ok()?)))
            .unwrap_or_else(|| LANDING_PATH.to_string())
    }

    fn push(&self, full_path: &str) {
        if let Some(history) = web_sys::window().and_then(|w| w.history().ok()) {
            if let Err(e) = history.push_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(full_path)) {
                log::warn!("pushState failed: {:?}", e);
            }
        }
    }

    fn replace(&self, full_path: &str) {
        if let Some(history) = web_sys::window().and_then(|w| w.history().ok()) {
            if let Err(e) = history.replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(full_path)) {
                log::warn!("replaceState failed: {:?}", e);
            }
        }
    }

    fn set_title(&self, title: &str) {
        if let Some(document) = web_sys::window().and_then(|w| w.document()) {
            document.set_title(title);
        }
    }
}

/// Redirect chains longer than this are cut short.
const MAX_REDIRECTS: usize = 3;

pub struct Router {
    session: Rc<SessionStore>,
    history: Rc<dyn History>,
    current: RefCell<RouteMatch>,
    revision: Cell<u64>,
}

impl Router {
    /// Starts at whatever `history` shows; call [`Router::start`] to guard
    /// that first location.
    pub fn new(session: Rc<SessionStore>, history: Rc<dyn History>) -> Self {
        let current = resolve(&history.location());
        Self {
            session,
            history,
            current: RefCell::new(current),
            revision: Cell::new(0),
        }
    }

    pub fn current(&self) -> RouteMatch {
        self.current.borrow().clone()
    }

    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    /// Guard the initial location, replacing it if the guard redirects.
    pub fn start(&self) -> RouteMatch {
        let location = self.history.location();
        self.settle(&location, |history, path| history.replace(path))
    }

    /// Navigate to `full_path`, adding one history entry for the final
    /// location.
    pub fn push(&self, full_path: &str) -> RouteMatch {
        self.settle(full_path, |history, path| history.push(path))
    }

    /// Back/forward: the browser already moved, so redirects replace.
    pub fn handle_pop(&self) -> RouteMatch {
        self.start()
    }

    /// Where to go after a successful login: the `redirect` query of the
    /// current route, or the landing page.
    pub fn after_login_target(&self) -> String {
        self.current
            .borrow()
            .query_value("redirect")
            .filter(|target| target.starts_with('/') && !target.starts_with("//"))
            .unwrap_or(LANDING_PATH)
            .to_string()
    }

    fn settle(&self, requested: &str, commit: impl Fn(&dyn History, &str)) -> RouteMatch {
        let first = resolve(requested);
        let mut target = first.clone();
        for _ in 0..MAX_REDIRECTS {
            match guard(&target, &self.session) {
                GuardDecision::Proceed => break,
                GuardDecision::Redirect(next) => {
                    log::debug!("guard redirect {} -> {}", target.full_path(), next);
                    target = resolve(&next);
                }
            }
        }

        let full_path = target.full_path();
        if full_path != self.history.location() || target != first {
            commit(self.history.as_ref(), &full_path);
        }
        self.history.set_title(&target.document_title());
        *self.current.borrow_mut() = target.clone();
        self.revision.set(self.revision.get().wrapping_add(1));
        target
    }
}

impl Navigator for Router {
    fn current_full_path(&self) -> String {
        self.current.borrow().full_path()
    }

    fn is_login_route(&self) -> bool {
        self.current.borrow().route.name == LOGIN_ROUTE
    }

    fn to_login(&self, redirect: &str) {
        self.push(&login_path(redirect));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{TOKEN_KEY, USER_KEY};
    use crate::storage::KeyValueStore;
    use crate::stores::test_support::Harness;

    fn router(h: &Harness, start: &str) -> (Router, Rc<MemoryHistory>, Rc<SessionStore>) {
        let history = Rc::new(MemoryHistory::new(start));
        let session = Rc::new(SessionStore::new(h.client.clone()));
        (Router::new(session.clone(), history.clone()), history, session)
    }

    fn sign_in(h: &Harness) {
        h.store.set(TOKEN_KEY, "jwt").unwrap();
        h.store.set(USER_KEY, r#"{"id":1,"username":"alice"}"#).unwrap();
    }

    #[test]
    fn resolves_patterns_aliases_and_fallback() {
        let m = resolve("/workflows/42/execute?tab=logs");
        assert_eq!(m.route.name, "workflow-execute");
        assert_eq!(m.id(), Some(42));
        assert_eq!(m.query_value("tab"), Some("logs"));

        assert_eq!(resolve("/workflows/create").route.name, "workflow-create");
        assert_eq!(resolve("/workflows/7/").route.name, "workflow-detail");

        let alias = resolve("/login");
        assert_eq!(alias.route.name, "login");
        assert_eq!(alias.path, "/auth/login");

        let missing = resolve("/nope/deeper");
        assert_eq!(missing.route.name, "not-found");
        assert_eq!(missing.document_title(), "页面未找到 - JiLang Agent");
    }

    #[test]
    fn unauthenticated_visit_redirects_to_login_with_target() {
        let h = Harness::new();
        let (router, history, _) = router(&h, "/");
        let landed = router.push("/workflows/5");
        assert_eq!(landed.route.name, "login");
        assert_eq!(landed.query_value("redirect"), Some("/workflows/5"));
        assert_eq!(history.title(), "登录 - JiLang Agent");
        assert_eq!(history.entries().last().unwrap(), &landed.full_path());
    }

    #[test]
    fn authenticated_visit_to_login_goes_to_landing() {
        let h = Harness::new();
        sign_in(&h);
        let (router, _, session) = router(&h, "/");
        let landed = router.push("/auth/login");
        assert_eq!(landed.route.name, "dashboard");
        assert!(session.is_authenticated());
    }

    #[test]
    fn persisted_token_is_restored_lazily() {
        let h = Harness::new();
        sign_in(&h);
        let (router, _, session) = router(&h, "/");
        assert!(!session.is_authenticated());
        assert_eq!(router.push("/agents/3").route.name, "agent-detail");
        assert_eq!(session.user().unwrap().username, "alice");
    }

    #[test]
    fn stored_token_without_profile_passes_the_guard() {
        let h = Harness::new();
        h.store.set(TOKEN_KEY, "jwt").unwrap();
        let (router, _, session) = router(&h, "/");
        let landed = router.push("/workflows/5");
        assert_eq!(landed.route.name, "workflow-detail");
        assert_eq!(landed.full_path(), "/workflows/5");
        assert!(session.is_authenticated());
    }

    #[test]
    fn start_replaces_guarded_initial_location() {
        let h = Harness::new();
        let (router, history, _) = router(&h, "/settings");
        let landed = router.start();
        assert_eq!(landed.route.name, "login");
        assert_eq!(history.entries().len(), 1);
        assert_eq!(router.after_login_target(), "/settings");
    }

    #[test]
    fn navigator_reports_login_route() {
        let h = Harness::new();
        sign_in(&h);
        let (router, _, _) = router(&h, "/help");
        router.start();
        assert!(!router.is_login_route());
        // A 401 clears storage before asking for the login page.
        h.store.remove(TOKEN_KEY);
        router.to_login("/help");
        assert!(router.is_login_route());
        assert_eq!(router.after_login_target(), "/help");
    }

    #[test]
    fn open_redirects_are_ignored() {
        let h = Harness::new();
        let (router, _, _) = router(&h, "/");
        router.push("/auth/login?redirect=%2F%2Fevil.example");
        assert_eq!(router.after_login_target(), "/");
    }
}
