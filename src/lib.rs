//! Browser console for the JiLang agent platform: session, settings, theme,
//! workflow/execution/agent listings and the routing shell around them.
//!
//! Everything except the DOM and `fetch` glue runs natively, so stores and
//! the router are exercised with plain `cargo test`.

pub mod app;
pub mod constants;
pub mod dom_utils;
pub mod error;
pub mod logging;
pub mod models;
pub mod network;
pub mod router;
pub mod scheduling;
pub mod status;
pub mod storage;
pub mod stores;
pub mod toast;
pub mod utils;

pub use app::AppContext;
pub use error::ApiError;

#[cfg(target_arch = "wasm32")]
mod entry {
    use std::cell::Cell;
    use std::rc::Rc;

    use gloo_timers::callback::Interval;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::spawn_local;

    use crate::app::AppContext;
    use crate::constants::TICK_INTERVAL_MS;
    use crate::{dom_utils, logging, toast};

    fn render(ctx: &AppContext) {
        let result = toast::render(&ctx.notifications)
            .and_then(|_| dom_utils::apply_theme(&ctx.theme, &ctx.settings))
            .and_then(|_| dom_utils::apply_layout(&ctx.settings.settings().layout))
            .and_then(|_| dom_utils::render_loading_bar(&ctx.loading));
        if let Err(err) = result {
            log::error!("render failed: {:?}", err);
        }
    }

    #[wasm_bindgen(start)]
    pub fn start() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        logging::init();

        let ctx = Rc::new(AppContext::browser());
        ctx.initialize();
        ctx.theme.set_system_dark_mode(dom_utils::prefers_dark());
        render(&ctx);

        if ctx.session.is_authenticated() && ctx.session.user().is_none() {
            let ctx = ctx.clone();
            spawn_local(async move {
                if let Err(err) = ctx.session.fetch_profile().await {
                    log::warn!("profile restore failed: {}", err);
                }
            });
        }
        log::info!("console started at {}", ctx.router.current().full_path());

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let on_pop = {
            let ctx = ctx.clone();
            Closure::<dyn Fn(web_sys::Event)>::new(move |_: web_sys::Event| {
                ctx.router.handle_pop();
            })
        };
        window.add_event_listener_with_callback("popstate", on_pop.as_ref().unchecked_ref())?;
        on_pop.forget();

        let seen = Cell::new(ctx.revision());
        Interval::new(TICK_INTERVAL_MS, move || {
            if let Some(revision) = ctx.poll(dom_utils::prefers_dark(), seen.get()) {
                seen.set(revision);
                render(&ctx);
            }
        })
        .forget();
        Ok(())
    }
}
