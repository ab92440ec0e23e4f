//! Draws the notification queue into `#toast-root`.
//!
//! The container and its stylesheet are created on first use.  Each render
//! rebuilds the list from the store, newest on top; hidden entries keep
//! their node with a `toast-hiding` class until the store purges them.

use crate::stores::notification::{Notification, NotificationKind};

/// CSS classes for one toast.
pub fn toast_class(kind: NotificationKind, visible: bool) -> String {
    let mut class = format!("toast toast-{}", kind.as_str());
    if !visible {
        class.push_str(" toast-hiding");
    }
    class
}

/// Accessible role: errors and warnings interrupt, the rest are polite.
pub fn toast_role(notification: &Notification) -> &'static str {
    match notification.kind {
        NotificationKind::Error | NotificationKind::Warning => "alert",
        NotificationKind::Success | NotificationKind::Info => "status",
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::render;

#[cfg(target_arch = "wasm32")]
mod browser {
    use std::rc::Rc;

    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{JsCast, JsValue};
    use web_sys::{Document, Element};

    use super::{toast_class, toast_role};
    use crate::stores::notification::{Notification, NotificationStore};

    const STYLES: &str = "
.toast-root{position:fixed;top:16px;right:16px;display:flex;flex-direction:column;gap:8px;z-index:9999;font-family:Arial,Helvetica,sans-serif}
.toast{min-width:240px;padding:10px 16px;border-radius:4px;color:#fff;box-shadow:0 2px 4px rgba(0,0,0,.1);transition:opacity .3s,transform .3s}
.toast-title{font-weight:bold;margin-right:8px}
.toast-close{float:right;background:none;border:none;color:inherit;cursor:pointer}
.toast-success{background:#16a34a}
.toast-error{background:#dc2626}
.toast-warning{background:#d97706}
.toast-info{background:#2563eb}
.toast-hiding{opacity:0;transform:translateX(24px)}
";

    pub fn render(store: &Rc<NotificationStore>) -> Result<(), JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        ensure_styles(&document)?;
        let root = ensure_root(&document, store)?;
        root.set_inner_html("");
        for notification in store.notifications() {
            root.append_child(&toast_node(&document, &notification)?)?;
        }
        Ok(())
    }

    fn toast_node(document: &Document, notification: &Notification) -> Result<Element, JsValue> {
        let node = document.create_element("div")?;
        node.set_class_name(&toast_class(notification.kind, notification.visible));
        node.set_attribute("role", toast_role(notification))?;
        node.set_attribute("data-id", &notification.id)?;

        let close = document.create_element("button")?;
        close.set_class_name("toast-close");
        close.set_attribute("aria-label", "关闭")?;
        close.set_text_content(Some("×"));
        node.append_child(&close)?;

        let title = document.create_element("span")?;
        title.set_class_name("toast-title");
        title.set_text_content(Some(&notification.title));
        node.append_child(&title)?;

        let message = document.create_element("span")?;
        message.set_class_name("toast-message");
        message.set_text_content(Some(&notification.message));
        node.append_child(&message)?;
        Ok(node)
    }

    /// Close buttons are handled by one delegated listener on the root,
    /// installed when the root is created.
    fn ensure_root(document: &Document, store: &Rc<NotificationStore>) -> Result<Element, JsValue> {
        if let Some(root) = document.get_element_by_id("toast-root") {
            return Ok(root);
        }
        let root = document.create_element("div")?;
        root.set_id("toast-root");
        root.set_class_name("toast-root");
        root.set_attribute("aria-live", "polite")?;

        let weak = Rc::downgrade(store);
        let on_click = Closure::<dyn Fn(web_sys::Event)>::new(move |event: web_sys::Event| {
            let id = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .filter(|el| el.class_list().contains("toast-close"))
                .and_then(|el| el.closest(".toast").ok().flatten())
                .and_then(|toast| toast.get_attribute("data-id"));
            if let (Some(id), Some(store)) = (id, weak.upgrade()) {
                store.remove(&id);
            }
        });
        root.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
        on_click.forget();

        document
            .body()
            .ok_or_else(|| JsValue::from_str("no body"))?
            .append_child(&root)?;
        Ok(root)
    }

    fn ensure_styles(document: &Document) -> Result<(), JsValue> {
        if document.get_element_by_id("toast-styles").is_some() {
            return Ok(());
        }
        let style = document.create_element("style")?;
        style.set_id("toast-styles");
        style.set_text_content(Some(STYLES));
        match document.head() {
            Some(head) => head.append_child(&style)?,
            None => document
                .body()
                .ok_or_else(|| JsValue::from_str("no body"))?
                .append_child(&style)?,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_reflects_kind_and_visibility() {
        assert_eq!(toast_class(NotificationKind::Error, true), "toast toast-error");
        assert_eq!(
            toast_class(NotificationKind::Info, false),
            "toast toast-info toast-hiding"
        );
    }
}
