//! Reflects theme, layout and the global loading bar onto the document.
//!
//! The class and variable computations are plain functions; only the
//! `apply_*` wrappers touch the DOM.

use crate::models::LayoutSettings;
use crate::stores::loading::GlobalLoading;

/// `(class, enabled)` pairs for `<html>` derived from the layout settings.
pub fn layout_classes(layout: &LayoutSettings) -> [(&'static str, bool); 3] {
    [
        ("sidebar-right", layout.sidebar_position == "right"),
        ("content-full-width", layout.content_width == "full"),
        ("compact-mode", layout.compact_mode),
    ]
}

/// Both the settings page and the theme toggle style off these.
pub fn theme_classes(dark: bool) -> [(&'static str, bool); 2] {
    [("dark", dark), ("dark-theme", dark)]
}

/// Inline style for the top progress bar; `None` hides it.
pub fn loading_bar_style(global: &GlobalLoading) -> Option<String> {
    global
        .is_loading
        .then(|| format!("width:{}%", global.progress))
}

#[cfg(target_arch = "wasm32")]
pub use browser::{apply_layout, apply_theme, prefers_dark, render_loading_bar};

#[cfg(target_arch = "wasm32")]
mod browser {
    use wasm_bindgen::{JsCast, JsValue};
    use web_sys::{Document, Element, HtmlElement};

    use super::{layout_classes, loading_bar_style, theme_classes};
    use crate::models::LayoutSettings;
    use crate::stores::{LoadingStore, SettingsStore, ThemeStore};

    fn document() -> Result<Document, JsValue> {
        web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))
    }

    fn root() -> Result<HtmlElement, JsValue> {
        document()?
            .document_element()
            .ok_or_else(|| JsValue::from_str("no document element"))?
            .dyn_into::<HtmlElement>()
            .map_err(|_| JsValue::from_str("document element is not HTML"))
    }

    fn toggle_all(el: &Element, classes: &[(&str, bool)]) -> Result<(), JsValue> {
        for (class, on) in classes {
            el.class_list().toggle_with_force(class, *on)?;
        }
        Ok(())
    }

    /// `prefers-color-scheme: dark`, false when the query is unsupported.
    pub fn prefers_dark() -> bool {
        web_sys::window()
            .and_then(|w| w.match_media("(prefers-color-scheme: dark)").ok().flatten())
            .is_some_and(|query| query.matches())
    }

    pub fn apply_theme(theme: &ThemeStore, settings: &SettingsStore) -> Result<(), JsValue> {
        let root = root()?;
        toggle_all(&root, &theme_classes(theme.is_dark_mode()))?;
        root.set_attribute("data-theme", &settings.settings().theme.color)?;

        let style = root.style();
        for (name, value) in theme.css_variables() {
            style.set_property(name, value)?;
        }
        let primary = settings.primary_color();
        style.set_property("--primary-color", primary)?;

        if let Some(meta) = document()?.query_selector("meta[name='theme-color']")? {
            meta.set_attribute("content", primary)?;
        }
        Ok(())
    }

    pub fn apply_layout(layout: &LayoutSettings) -> Result<(), JsValue> {
        toggle_all(&root()?, &layout_classes(layout))
    }

    /// Keeps `#loading-bar` in sync with the global spinner.
    pub fn render_loading_bar(loading: &LoadingStore) -> Result<(), JsValue> {
        let document = document()?;
        let bar = match document.get_element_by_id("loading-bar") {
            Some(bar) => bar,
            None => {
                let bar = document.create_element("div")?;
                bar.set_id("loading-bar");
                bar.set_class_name("loading-bar");
                document
                    .body()
                    .ok_or_else(|| JsValue::from_str("no body"))?
                    .append_child(&bar)?;
                bar
            }
        };
        let global = loading.global();
        match loading_bar_style(&global) {
            Some(style) => {
                bar.set_attribute("style", &style)?;
                bar.set_attribute("title", &global.message)?;
                bar.class_list().remove_1("hidden")?;
            }
            None => bar.class_list().add_1("hidden")?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_class_mapping() {
        let mut layout = LayoutSettings::default();
        assert!(layout_classes(&layout).iter().all(|(_, on)| !on));
        layout.sidebar_position = "right".into();
        layout.content_width = "full".into();
        layout.compact_mode = true;
        assert!(layout_classes(&layout).iter().all(|(_, on)| *on));
    }

    #[test]
    fn loading_bar_tracks_progress() {
        let mut global = GlobalLoading::default();
        assert_eq!(loading_bar_style(&global), None);
        global.is_loading = true;
        global.progress = 40;
        assert_eq!(loading_bar_style(&global).as_deref(), Some("width:40%"));
        assert_eq!(theme_classes(true), [("dark", true), ("dark-theme", true)]);
    }
}
