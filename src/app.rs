use std::cell::Cell;
use std::rc::Rc;

use leptos::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, Event, HtmlElement};

use crate::api;
use crate::badge::apply_badge;
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::leaderboard::Leaderboard;
use crate::live::{LiveUpdates, Notifier, UpdateSink};
use crate::push::PushNotifications;
use crate::toast::{ToastHost, Toasts};
use crate::types::LeaderboardEntry;

pub const LEADERBOARD_ID: &str = "leaderboard";
pub const BADGE_ID: &str = "notification-badge";
/// Clicking an element carrying this attribute marks that notification read.
pub const MARK_READ_ATTR: &str = "data-mark-read";

/// Routes live updates into signals rendered on the server-built page.
struct PageSink {
    document: Document,
    leaderboard: RwSignal<Vec<LeaderboardEntry>>,
    leaderboard_mounted: Cell<bool>,
    unread: RwSignal<Option<u32>>,
    toasts: Toasts,
}

impl PageSink {
    // The server-rendered rows stay until the first update replaces them.
    fn mount_leaderboard(&self) {
        if self.leaderboard_mounted.get() {
            return;
        }
        let Some(host) = self
            .document
            .get_element_by_id(LEADERBOARD_ID)
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        else {
            return;
        };
        host.set_inner_html("");
        let entries = self.leaderboard.read_only();
        mount_to(host, move || view! { <Leaderboard entries=entries/> });
        self.leaderboard_mounted.set(true);
    }
}

impl UpdateSink for PageSink {
    fn replace_leaderboard(&self, entries: Vec<LeaderboardEntry>) {
        self.leaderboard.set(entries);
        self.mount_leaderboard();
    }

    fn set_unread(&self, count: u32) {
        self.unread.set(Some(count));
    }

    fn toast(&self, message: &str) {
        self.toasts.show(message);
    }
}

fn document() -> Result<Document> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or(ClientError::Unsupported("document"))
}

/// Build both components and wire the notifier into the live feed.
pub fn start(config: Config) -> Result<()> {
    let document = document()?;
    let config = Rc::new(config);

    let push = PushNotifications::new(config.clone());
    push.start();

    let toasts = Toasts::new(config.toast_lifetime_ms);
    mount_to_body(move || view! { <ToastHost toasts=toasts/> });

    let unread = create_rw_signal(None::<u32>);
    if let Some(badge) = document.get_element_by_id(BADGE_ID) {
        create_effect(move |_| {
            if let Some(count) = unread.get() {
                if let Err(e) = apply_badge(&badge, count) {
                    log::error!("Could not update badge: {}", e);
                }
            }
        });
    }

    let sink = Rc::new(PageSink {
        document: document.clone(),
        leaderboard: create_rw_signal(Vec::new()),
        leaderboard_mounted: Cell::new(false),
        unread,
        toasts,
    });
    let notifier: Rc<dyn Notifier> = Rc::new(push);
    let live = LiveUpdates::new(config.clone(), sink, Some(notifier));
    live.start();

    bind_mark_read(&document, config)?;

    Ok(())
}

/// Id carried by the nearest `data-mark-read` element around `target`.
pub fn mark_read_id(target: &Element) -> Option<u32> {
    let marked = target.closest(&format!("[{}]", MARK_READ_ATTR)).ok()??;
    marked.get_attribute(MARK_READ_ATTR)?.trim().parse().ok()
}

// One delegated listener covers notification rows rendered after load too.
fn bind_mark_read(document: &Document, config: Rc<Config>) -> Result<()> {
    let onclick = Closure::wrap(Box::new(move |event: Event| {
        let Some(id) = event
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .and_then(|el| mark_read_id(&el))
        else {
            return;
        };
        let config = config.clone();
        spawn_local(async move {
            if let Err(e) = mark_read(&config, id).await {
                log::error!("Could not mark notification {} read: {}", id, e);
            }
        });
    }) as Box<dyn FnMut(Event)>);
    document.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
    onclick.forget();
    Ok(())
}

/// Mark one notification read; the next unread poll reflects it.
pub async fn mark_read(config: &Config, notification_id: u32) -> Result<bool> {
    let document = document()?;
    let csrf = api::csrf_token(&document)?;
    let response = api::mark_notification_read(config, &csrf, notification_id).await?;
    if !response.is_success() {
        log::error!("Server refused to mark notification {} read", notification_id);
    }
    Ok(response.is_success())
}
