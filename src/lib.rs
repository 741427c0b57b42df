pub mod api;
pub mod app;
pub mod backoff;
pub mod badge;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod live;
pub mod push;
pub mod toast;
pub mod types;
pub mod vapid;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::config::Config;
use crate::push::PushNotifications;

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();

    let config = web_sys::window()
        .and_then(|w| w.document())
        .map(|d| Config::from_document(&d))
        .unwrap_or_default();
    wasm_logger::init(wasm_logger::Config::new(config.log_level));

    if let Err(e) = app::start(config) {
        log::error!("Live client did not start: {}", e);
    }
}

/// Explicit opt-in for page buttons. Resolves to `true` when granted.
#[wasm_bindgen]
pub fn request_notification_permission() -> js_sys::Promise {
    future_to_promise(async { Ok(JsValue::from_bool(PushNotifications::request_permission().await)) })
}

