//! Light / dark / system theme plus the primary colour palette.

use std::cell::{Cell, RefCell};

use crate::constants::{THEME_COLOR_KEY, THEME_MODE_KEY};
use crate::storage::SharedStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
    System,
}

impl ThemeMode {
    pub const ALL: [ThemeMode; 3] = [ThemeMode::Light, ThemeMode::Dark, ThemeMode::System];

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::System => "system",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == raw)
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemeMode::Light => "浅色模式",
            ThemeMode::Dark => "深色模式",
            ThemeMode::System => "跟随系统",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeColor {
    pub name: &'static str,
    pub value: &'static str,
    pub label: &'static str,
}

pub const PALETTE: [ThemeColor; 5] = [
    ThemeColor { name: "blue", value: "#1976d2", label: "蓝色" },
    ThemeColor { name: "green", value: "#2e7d32", label: "绿色" },
    ThemeColor { name: "purple", value: "#7b1fa2", label: "紫色" },
    ThemeColor { name: "orange", value: "#e65100", label: "橙色" },
    ThemeColor { name: "red", value: "#c62828", label: "红色" },
];

#[derive(Debug, Clone, PartialEq)]
struct ThemeState {
    mode: ThemeMode,
    color: &'static ThemeColor,
    system_dark_mode: bool,
}

pub struct ThemeStore {
    store: SharedStore,
    state: RefCell<ThemeState>,
    revision: Cell<u64>,
}

impl ThemeStore {
    /// Restores `themeMode` / `themeColor`; anything unrecognised falls back
    /// to light / blue.
    pub fn new(store: SharedStore) -> Self {
        let mode = store
            .get(THEME_MODE_KEY)
            .and_then(|raw| ThemeMode::parse(&raw))
            .unwrap_or(ThemeMode::Light);
        let color = store
            .get(THEME_COLOR_KEY)
            .and_then(|raw| find_color(&raw))
            .unwrap_or(&PALETTE[0]);
        Self {
            store,
            state: RefCell::new(ThemeState {
                mode,
                color,
                system_dark_mode: false,
            }),
            revision: Cell::new(0),
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    fn touch(&self) {
        self.revision.set(self.revision.get().wrapping_add(1));
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            log::warn!("failed to persist {}: {}", key, e);
        }
    }

    pub fn mode(&self) -> ThemeMode {
        self.state.borrow().mode
    }

    pub fn color(&self) -> &'static ThemeColor {
        self.state.borrow().color
    }

    pub fn current_color_value(&self) -> &'static str {
        self.color().value
    }

    pub fn system_dark_mode(&self) -> bool {
        self.state.borrow().system_dark_mode
    }

    pub fn is_dark_mode(&self) -> bool {
        let state = self.state.borrow();
        state.mode == ThemeMode::Dark || (state.mode == ThemeMode::System && state.system_dark_mode)
    }

    pub fn mode_options(&self) -> Vec<(&'static str, &'static str)> {
        ThemeMode::ALL.iter().map(|m| (m.as_str(), m.label())).collect()
    }

    /// Returns `false` (and changes nothing) for an unknown mode.
    pub fn set_mode(&self, mode: &str) -> bool {
        let Some(mode) = ThemeMode::parse(mode) else {
            log::warn!("ignoring unknown theme mode '{}'", mode);
            return false;
        };
        self.state.borrow_mut().mode = mode;
        self.persist(THEME_MODE_KEY, mode.as_str());
        self.touch();
        true
    }

    /// Only palette colours are accepted.
    pub fn set_color(&self, name: &str) -> bool {
        let Some(color) = find_color(name) else {
            log::warn!("ignoring unknown theme color '{}'", name);
            return false;
        };
        self.state.borrow_mut().color = color;
        self.persist(THEME_COLOR_KEY, color.name);
        self.touch();
        true
    }

    /// Dark becomes light; anything else becomes dark.
    pub fn toggle_dark_mode(&self) {
        let next = if self.mode() == ThemeMode::Dark {
            ThemeMode::Light
        } else {
            ThemeMode::Dark
        };
        self.set_mode(next.as_str());
    }

    /// Fed from the `prefers-color-scheme` media query.
    pub fn set_system_dark_mode(&self, dark: bool) {
        let changed = {
            let mut state = self.state.borrow_mut();
            let changed = state.system_dark_mode != dark;
            state.system_dark_mode = dark;
            changed
        };
        if changed {
            self.touch();
        }
    }

    /// Custom properties to set on the document root.
    pub fn css_variables(&self) -> Vec<(&'static str, &'static str)> {
        let surface = if self.is_dark_mode() {
            [("#121212"), ("#ffffff"), ("#1e1e1e"), ("#333333")]
        } else {
            [("#f5f5f5"), ("#333333"), ("#ffffff"), ("#e0e0e0")]
        };
        vec![
            ("--primary-color", self.current_color_value()),
            ("--bg-color", surface[0]),
            ("--text-color", surface[1]),
            ("--card-bg", surface[2]),
            ("--border-color", surface[3]),
        ]
    }
}

fn find_color(name: &str) -> Option<&'static ThemeColor> {
    PALETTE.iter().find(|c| c.name == name)
}

/// Black or white, whichever reads better on `hex` (`#rrggbb`).
/// Unparseable input gets white.
pub fn contrast_color(hex: &str) -> &'static str {
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|part| u8::from_str_radix(part, 16).ok())
            .map(u32::from)
    };
    let (Some(r), Some(g), Some(b)) = (channel(1..3), channel(3..5), channel(5..7)) else {
        return "#ffffff";
    };
    let brightness = (r * 299 + g * 587 + b * 114) / 1000;
    if brightness > 128 {
        "#000000"
    } else {
        "#ffffff"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::rc::Rc;

    fn store() -> (SharedStore, ThemeStore) {
        let backing: SharedStore = Rc::new(MemoryStore::new());
        (backing.clone(), ThemeStore::new(backing))
    }

    #[test]
    fn restores_persisted_choice_and_rejects_garbage() {
        let backing: SharedStore = Rc::new(MemoryStore::new());
        backing.set(THEME_MODE_KEY, "system").unwrap();
        backing.set(THEME_COLOR_KEY, "chartreuse").unwrap();
        let theme = ThemeStore::new(backing);
        assert_eq!(theme.mode(), ThemeMode::System);
        assert_eq!(theme.color().name, "blue");
    }

    #[test]
    fn dark_mode_derivation() {
        let (_, theme) = store();
        assert!(!theme.is_dark_mode());
        theme.set_mode("system");
        assert!(!theme.is_dark_mode());
        theme.set_system_dark_mode(true);
        assert!(theme.is_dark_mode());
        theme.set_mode("light");
        assert!(!theme.is_dark_mode());
        theme.toggle_dark_mode();
        assert_eq!(theme.mode(), ThemeMode::Dark);
        theme.toggle_dark_mode();
        assert_eq!(theme.mode(), ThemeMode::Light);
    }

    #[test]
    fn setters_validate_and_persist() {
        let (backing, theme) = store();
        assert!(!theme.set_mode("sepia"));
        assert!(!theme.set_color("teal"));
        assert!(backing.get(THEME_MODE_KEY).is_none());

        assert!(theme.set_color("purple"));
        assert_eq!(theme.current_color_value(), "#7b1fa2");
        assert_eq!(backing.get(THEME_COLOR_KEY).as_deref(), Some("purple"));
    }

    #[test]
    fn css_variables_follow_mode() {
        let (_, theme) = store();
        theme.set_color("green");
        let vars = theme.css_variables();
        assert_eq!(vars[0], ("--primary-color", "#2e7d32"));
        assert_eq!(vars[1], ("--bg-color", "#f5f5f5"));
        theme.set_mode("dark");
        assert_eq!(theme.css_variables()[1], ("--bg-color", "#121212"));
    }

    #[test]
    fn contrast_picks_readable_text() {
        assert_eq!(contrast_color("#ffffff"), "#000000");
        assert_eq!(contrast_color("#1976d2"), "#ffffff");
        assert_eq!(contrast_color("#e65100"), "#ffffff");
        assert_eq!(contrast_color("#ffeb3b"), "#000000");
        assert_eq!(contrast_color("nope"), "#ffffff");
    }
}
