//! User preferences: theme, locale, layout and notification channels.
//!
//! Server and local storage both hold a full [`Settings`] document.  Every
//! incoming document (fetched, patched or restored) is merged section by
//! section over the current one, so partial payloads never reset the
//! fields they omit.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{Map, Value};

use super::theme::{ThemeMode, ThemeStore, PALETTE};
use crate::constants::{LEGACY_SYSTEM_SETTINGS_KEY, SETTINGS_KEY};
use crate::error::ApiError;
use crate::models::Settings;
use crate::network::api::settings as settings_api;
use crate::network::ApiClient;
use crate::storage::{load_json, save_json, SharedStore};

/// Named primary colours accepted in `theme.color`.
pub const PRIMARY_COLORS: [(&str, &str); 10] = [
    ("blue", "#1976d2"),
    ("green", "#4caf50"),
    ("red", "#f44336"),
    ("purple", "#9c27b0"),
    ("orange", "#ff9800"),
    ("cyan", "#00bcd4"),
    ("pink", "#e91e63"),
    ("brown", "#795548"),
    ("gray", "#9e9e9e"),
    ("black", "#212121"),
];

/// Hex value of a named colour; unknown names get blue.
pub fn primary_color_of(name: &str) -> &'static str {
    PRIMARY_COLORS
        .iter()
        .find(|(n, _)| *n == name)
        .map_or(PRIMARY_COLORS[0].1, |(_, hex)| hex)
}

const SECTIONS: [&str; 3] = ["theme", "layout", "notifications"];
const SCALARS: [&str; 4] = ["language", "dateFormat", "timeFormat", "timezone"];
const LAYOUT_OPTIONS: [&str; 3] = ["sidebarPosition", "contentWidth", "compactMode"];

/// Shallow-merge `patch` over `base`.  Object sections merge key by key;
/// scalar fields are replaced only by non-empty strings.
pub fn merge_settings(base: &Settings, patch: &Value) -> Result<Settings, serde_json::Error> {
    let mut merged = serde_json::to_value(base)?;
    if let (Some(target), Some(source)) = (merged.as_object_mut(), patch.as_object()) {
        for section in SECTIONS {
            if let (Some(Value::Object(into)), Some(Value::Object(from))) =
                (target.get_mut(section), source.get(section))
            {
                for (key, value) in from {
                    into.insert(key.clone(), value.clone());
                }
            }
        }
        for key in SCALARS {
            if let Some(Value::String(value)) = source.get(key) {
                if !value.is_empty() {
                    target.insert(key.to_string(), Value::String(value.clone()));
                }
            }
        }
    }
    serde_json::from_value(merged)
}

/// Maps the old `systemSettings` document onto the current layout.
fn from_legacy(legacy: &Value) -> Value {
    let mut patch = Map::new();
    let mut theme = Map::new();
    for (from, to) in [("theme", "mode"), ("themeColor", "color")] {
        if let Some(value) = legacy.get(from) {
            theme.insert(to.to_string(), value.clone());
        }
    }
    if !theme.is_empty() {
        patch.insert("theme".to_string(), Value::Object(theme));
    }
    for key in ["language", "timezone"] {
        if let Some(value) = legacy.get(key) {
            patch.insert(key.to_string(), value.clone());
        }
    }
    Value::Object(patch)
}

#[derive(Debug, Clone, Default, PartialEq)]
struct SettingsState {
    settings: Settings,
    loading: bool,
    error: Option<String>,
}

pub struct SettingsStore {
    client: Rc<ApiClient>,
    store: SharedStore,
    theme: Rc<ThemeStore>,
    state: RefCell<SettingsState>,
    revision: Cell<u64>,
}

impl SettingsStore {
    pub fn new(client: Rc<ApiClient>, store: SharedStore, theme: Rc<ThemeStore>) -> Self {
        Self {
            client,
            store,
            theme,
            state: RefCell::new(SettingsState::default()),
            revision: Cell::new(0),
        }
    }

    pub fn settings(&self) -> Settings {
        self.state.borrow().settings.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    pub fn current_language(&self) -> String {
        self.state.borrow().settings.language.clone()
    }

    pub fn primary_color(&self) -> &'static str {
        primary_color_of(&self.state.borrow().settings.theme.color)
    }

    /// `system_dark` is the browser's `prefers-color-scheme` answer.
    pub fn is_dark_mode(&self, system_dark: bool) -> bool {
        match self.state.borrow().settings.theme.mode.as_str() {
            "system" => system_dark,
            mode => mode == "dark",
        }
    }

    // ---------------- Remote ----------------

    /// Pull from the server.  On failure the error is recorded and the
    /// locally stored copy is used instead.
    pub async fn fetch_settings(&self) -> Result<Settings, ApiError> {
        self.begin();
        let result = settings_api::get_settings(&self.client).await;
        let outcome = match result {
            Ok(remote) => match self.apply(&remote) {
                Ok(settings) => {
                    self.save_to_storage();
                    Ok(settings)
                }
                Err(err) => Err(self.record_error(err, "获取设置失败")),
            },
            Err(err) => {
                let err = self.record_error(err, "获取设置失败");
                self.load_from_storage();
                Err(err)
            }
        };
        self.state.borrow_mut().loading = false;
        outcome
    }

    /// Merge `patch`, push the whole document, then persist it locally.
    /// Nothing changes locally when the server refuses.
    pub async fn update_settings(&self, patch: &Value) -> Result<Settings, ApiError> {
        self.begin();
        let merged = match merge_settings(&self.settings(), patch) {
            Ok(merged) => merged,
            Err(e) => return Err(self.fail(ApiError::Encode(e.to_string()), "更新设置失败")),
        };
        match settings_api::update_settings(&self.client, &merged).await {
            Ok(()) => {
                self.commit(merged.clone());
                self.save_to_storage();
                self.state.borrow_mut().loading = false;
                Ok(merged)
            }
            Err(err) => Err(self.fail(err, "更新设置失败")),
        }
    }

    // ---------------- Local edits ----------------

    pub fn set_theme_mode(&self, mode: &str) -> bool {
        if ThemeMode::parse(mode).is_none() {
            log::warn!("ignoring unknown theme mode '{}'", mode);
            return false;
        }
        self.edit_locally(serde_json::json!({ "theme": { "mode": mode } }))
    }

    pub fn set_theme_color(&self, color: &str) -> bool {
        if !PRIMARY_COLORS.iter().any(|(name, _)| *name == color) {
            log::warn!("ignoring unknown theme color '{}'", color);
            return false;
        }
        self.edit_locally(serde_json::json!({ "theme": { "color": color } }))
    }

    pub fn set_language(&self, language: &str) -> bool {
        self.edit_locally(serde_json::json!({ "language": language }))
    }

    /// Only `sidebarPosition`, `contentWidth` and `compactMode` exist;
    /// other names, or values of the wrong type, are ignored.
    pub fn set_layout_option(&self, option: &str, value: Value) -> bool {
        if !LAYOUT_OPTIONS.contains(&option) {
            return false;
        }
        let mut layout = Map::new();
        layout.insert(option.to_string(), value);
        self.edit_locally(serde_json::json!({ "layout": layout }))
    }

    pub fn reset_to_defaults(&self) {
        self.commit(Settings::default());
        self.save_to_storage();
    }

    // ---------------- Persistence ----------------

    /// Restore from `settings`, or from the legacy `systemSettings` key.
    /// With neither present the current settings are written out.
    /// Returns whether anything was restored.
    pub fn load_from_storage(&self) -> bool {
        let stored = match load_json::<Value>(self.store.as_ref(), SETTINGS_KEY) {
            Ok(Some(stored)) => Some(stored),
            Ok(None) => match load_json::<Value>(self.store.as_ref(), LEGACY_SYSTEM_SETTINGS_KEY) {
                Ok(legacy) => legacy.as_ref().map(from_legacy),
                Err(e) => {
                    log::warn!("ignoring legacy settings: {}", e);
                    None
                }
            },
            Err(e) => {
                log::error!("failed to parse stored settings: {}", e);
                return false;
            }
        };

        match stored {
            Some(stored) => match self.apply(&stored) {
                Ok(_) => true,
                Err(err) => {
                    log::error!("stored settings rejected: {}", err);
                    false
                }
            },
            None => {
                self.sync_theme();
                self.save_to_storage();
                false
            }
        }
    }

    pub fn save_to_storage(&self) {
        let settings = self.settings();
        if let Err(e) = save_json(self.store.as_ref(), SETTINGS_KEY, &settings) {
            log::warn!("failed to persist settings: {}", e);
        }
    }

    // ---------------- Internals ----------------

    fn begin(&self) {
        let mut state = self.state.borrow_mut();
        state.loading = true;
        state.error = None;
    }

    fn record_error(&self, err: ApiError, fallback: &str) -> ApiError {
        log::error!("{}: {}", fallback, err);
        self.state.borrow_mut().error = Some(err.message_or(fallback));
        err
    }

    fn fail(&self, err: ApiError, fallback: &str) -> ApiError {
        self.state.borrow_mut().loading = false;
        self.record_error(err, fallback)
    }

    fn apply(&self, patch: &Value) -> Result<Settings, ApiError> {
        let merged = merge_settings(&self.settings(), patch)
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        self.commit(merged.clone());
        Ok(merged)
    }

    fn edit_locally(&self, patch: Value) -> bool {
        match self.apply(&patch) {
            Ok(_) => {
                self.save_to_storage();
                true
            }
            Err(err) => {
                log::warn!("rejected settings edit: {}", err);
                false
            }
        }
    }

    fn commit(&self, settings: Settings) {
        self.state.borrow_mut().settings = settings;
        self.sync_theme();
        self.revision.set(self.revision.get().wrapping_add(1));
    }

    /// Mirror mode and colour into the theme store.  Colours outside its
    /// palette stay on the previous palette colour.
    fn sync_theme(&self) {
        let theme = self.state.borrow().settings.theme.clone();
        if self.theme.mode().as_str() != theme.mode {
            self.theme.set_mode(&theme.mode);
        }
        if self.theme.color().name != theme.color && PALETTE.iter().any(|c| c.name == theme.color) {
            self.theme.set_color(&theme.color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::KeyValueStore;
    use crate::stores::test_support::Harness;
    use futures::executor::block_on;
    use serde_json::json;

    fn store(h: &Harness) -> (SettingsStore, Rc<ThemeStore>) {
        let theme = Rc::new(ThemeStore::new(h.store.clone()));
        (
            SettingsStore::new(h.client.clone(), h.store.clone(), theme.clone()),
            theme,
        )
    }

    #[test]
    fn merge_is_shallow_per_section() {
        let base = Settings::default();
        let merged = merge_settings(
            &base,
            &json!({
                "theme": {"mode": "dark"},
                "layout": {"compactMode": true},
                "language": "",
                "timezone": "UTC",
                "notifications": {"browser": {"enabled": true}}
            }),
        )
        .unwrap();
        assert_eq!(merged.theme.mode, "dark");
        assert_eq!(merged.theme.color, "blue");
        assert!(merged.layout.compact_mode);
        assert_eq!(merged.layout.sidebar_position, "left");
        assert_eq!(merged.language, "zh-CN");
        assert_eq!(merged.timezone, "UTC");
        // Sections replace whole channels, not nested keys.
        assert!(merged.notifications["browser"].get("sound").is_none());
        assert_eq!(merged.notifications["email"]["enabled"], true);
    }

    #[test]
    fn fetch_merges_partial_document_and_syncs_theme() {
        let h = Harness::new();
        let (settings, theme) = store(&h);
        h.transport
            .push_json(200, json!({"theme": {"mode": "dark", "color": "green"}}));
        let fetched = block_on(settings.fetch_settings()).unwrap();
        assert_eq!(fetched.theme.mode, "dark");
        assert_eq!(fetched.language, "zh-CN");
        assert_eq!(theme.mode(), ThemeMode::Dark);
        assert_eq!(theme.color().name, "green");
        assert!(h.store.get(SETTINGS_KEY).unwrap().contains("\"dark\""));
        assert_eq!(h.transport.request_count(), 1);
    }

    #[test]
    fn fetch_failure_falls_back_to_storage() {
        let h = Harness::new();
        h.store
            .set(SETTINGS_KEY, r#"{"language":"en-US","layout":{"contentWidth":"full"}}"#)
            .unwrap();
        let (settings, _) = store(&h);
        h.transport.push_json(500, json!({}));
        assert!(block_on(settings.fetch_settings()).is_err());
        assert_eq!(settings.error().as_deref(), Some("获取设置失败"));
        assert!(!settings.loading());
        let current = settings.settings();
        assert_eq!(current.language, "en-US");
        assert_eq!(current.layout.content_width, "full");
    }

    #[test]
    fn update_puts_merged_document() {
        let h = Harness::new();
        let (settings, _) = store(&h);
        h.transport.push_json(200, json!({"success": true}));
        let merged = block_on(settings.update_settings(&json!({"dateFormat": "dd/MM/yyyy"}))).unwrap();
        assert_eq!(merged.date_format, "dd/MM/yyyy");

        let sent = h.transport.last_request().unwrap();
        assert_eq!(sent.method.as_str(), "PUT");
        assert!(sent.url.ends_with("/settings"));
        assert!(h.store.get(SETTINGS_KEY).unwrap().contains("dd/MM/yyyy"));

        h.transport.push_json(400, json!({"message": "bad format"}));
        assert!(block_on(settings.update_settings(&json!({"dateFormat": "??"}))).is_err());
        assert_eq!(settings.settings().date_format, "dd/MM/yyyy");
        assert_eq!(settings.error().as_deref(), Some("bad format"));
    }

    #[test]
    fn local_edits_validate_and_persist() {
        let h = Harness::new();
        let (settings, _) = store(&h);
        assert!(!settings.set_theme_mode("sepia"));
        assert!(!settings.set_theme_color("teal"));
        assert!(!settings.set_layout_option("fontSize", json!(14)));
        assert!(!settings.set_layout_option("compactMode", json!("yes")));
        assert!(h.store.get(SETTINGS_KEY).is_none());

        assert!(settings.set_theme_color("cyan"));
        assert_eq!(settings.primary_color(), "#00bcd4");
        assert!(settings.set_layout_option("sidebarPosition", json!("right")));
        assert_eq!(settings.settings().layout.sidebar_position, "right");

        settings.set_theme_mode("system");
        assert!(settings.is_dark_mode(true));
        assert!(!settings.is_dark_mode(false));

        settings.reset_to_defaults();
        assert_eq!(settings.settings(), Settings::default());
    }

    #[test]
    fn legacy_key_is_used_when_current_is_missing() {
        let h = Harness::new();
        h.store
            .set(
                LEGACY_SYSTEM_SETTINGS_KEY,
                r#"{"theme":"dark","themeColor":"purple","language":"en-US","dateFormat":"YYYY"}"#,
            )
            .unwrap();
        let (settings, theme) = store(&h);
        assert!(settings.load_from_storage());
        let current = settings.settings();
        assert_eq!(current.theme.mode, "dark");
        assert_eq!(current.theme.color, "purple");
        assert_eq!(current.language, "en-US");
        assert_eq!(current.date_format, "yyyy-MM-dd");
        assert_eq!(theme.color().name, "purple");
    }

    #[test]
    fn empty_storage_writes_defaults() {
        let h = Harness::new();
        let (settings, _) = store(&h);
        assert!(!settings.load_from_storage());
        assert!(h.store.get(SETTINGS_KEY).is_some());
        assert_eq!(primary_color_of("nope"), "#1976d2");
    }
}
