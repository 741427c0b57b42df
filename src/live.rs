use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gloo_timers::callback::{Interval, Timeout};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

use crate::api;
use crate::backoff::ReconnectPolicy;
use crate::config::Config;
use crate::types::{ChannelState, InboundMessage, LeaderboardEntry};

/// Something that can raise a platform notification.
pub trait Notifier {
    fn notify(&self, title: &str, body: &str);
}

/// Where live updates end up on the page.
pub trait UpdateSink {
    fn replace_leaderboard(&self, entries: Vec<LeaderboardEntry>);
    fn set_unread(&self, count: u32);
    fn toast(&self, message: &str);
}

/// Apply one inbound message, whether it came from the socket or a poll.
pub fn dispatch(message: InboundMessage, sink: &dyn UpdateSink, notifier: Option<&dyn Notifier>, title: &str) {
    match message {
        InboundMessage::LeaderboardUpdate(entries) => {
            log::debug!("Leaderboard update with {} houses", entries.len());
            sink.replace_leaderboard(entries);
        }
        InboundMessage::Notification(text) => {
            if let Some(notifier) = notifier {
                notifier.notify(title, &text);
            }
            sink.toast(&text);
        }
        InboundMessage::Unknown(kind) => {
            log::debug!("Unknown message type: {:?}", kind);
        }
    }
}

/// `ws://` or `wss://` URL for `path` on the page's own host.
pub fn channel_url(protocol: &str, host: &str, path: &str) -> String {
    let scheme = if protocol == "https:" { "wss:" } else { "ws:" };
    format!("{}//{}{}", scheme, host, path)
}

/// Channel state plus the reconnect budget, driven by socket events.
#[derive(Clone, Debug)]
pub struct ChannelTracker {
    state: ChannelState,
    policy: ReconnectPolicy,
}

impl ChannelTracker {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { state: ChannelState::Disconnected, policy }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.policy.attempts()
    }

    pub fn connecting(&mut self) {
        self.state = ChannelState::Connecting;
    }

    pub fn opened(&mut self) {
        self.state = ChannelState::Connected;
        self.policy.reset();
    }

    /// Delay before the next reconnect, or `None` once the budget is spent.
    pub fn closed(&mut self) -> Option<u32> {
        self.state = ChannelState::Disconnected;
        self.policy.next_delay()
    }
}

// Held so the socket callbacks live exactly as long as their socket.
struct SocketHandlers {
    _onopen: Closure<dyn FnMut()>,
    _onmessage: Closure<dyn FnMut(MessageEvent)>,
    _onclose: Closure<dyn FnMut(CloseEvent)>,
    _onerror: Closure<dyn FnMut(Event)>,
}

struct LiveInner {
    config: Rc<Config>,
    sink: Rc<dyn UpdateSink>,
    notifier: Option<Rc<dyn Notifier>>,
    channel: RefCell<ChannelTracker>,
    socket: RefCell<Option<WebSocket>>,
    handlers: RefCell<Option<SocketHandlers>>,
}

/// Socket feed with polling running alongside it.
#[derive(Clone)]
pub struct LiveUpdates {
    inner: Rc<LiveInner>,
}

impl LiveUpdates {
    pub fn new(config: Rc<Config>, sink: Rc<dyn UpdateSink>, notifier: Option<Rc<dyn Notifier>>) -> Self {
        let policy = ReconnectPolicy::new(
            config.max_reconnect_attempts,
            config.reconnect_base_ms,
            config.reconnect_cap_ms,
        );
        Self {
            inner: Rc::new(LiveInner {
                config,
                sink,
                notifier,
                channel: RefCell::new(ChannelTracker::new(policy)),
                socket: RefCell::new(None),
                handlers: RefCell::new(None),
            }),
        }
    }

    fn from_weak(weak: &Weak<LiveInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn state(&self) -> ChannelState {
        self.inner.channel.borrow().state()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.channel.borrow().attempts()
    }

    pub fn start(&self) {
        self.connect();
        self.start_polling();
    }

    /// Open the live channel. A no-op on browsers without WebSocket.
    pub fn connect(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        if !js_sys::Reflect::has(&window, &JsValue::from_str("WebSocket")).unwrap_or(false) {
            log::info!("WebSockets not supported, falling back to polling");
            return;
        }
        let location = window.location();
        let (Ok(protocol), Ok(host)) = (location.protocol(), location.host()) else {
            log::error!("Cannot read page location for live channel");
            return;
        };
        let url = channel_url(&protocol, &host, &self.inner.config.live_channel_path);

        self.detach_socket();
        self.inner.channel.borrow_mut().connecting();
        let ws = match WebSocket::new(&url) {
            Ok(ws) => ws,
            Err(e) => {
                log::error!("WebSocket error: {:?}", e);
                self.handle_close();
                return;
            }
        };

        let weak = Rc::downgrade(&self.inner);
        let onopen = Closure::wrap(Box::new(move || {
            if let Some(live) = Self::from_weak(&weak) {
                live.handle_open();
            }
        }) as Box<dyn FnMut()>);
        ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));

        let weak = Rc::downgrade(&self.inner);
        let onmessage = Closure::wrap(Box::new(move |e: MessageEvent| {
            if let (Some(live), Some(text)) = (Self::from_weak(&weak), e.data().as_string()) {
                live.handle_text(&text);
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));

        let weak = Rc::downgrade(&self.inner);
        let onclose = Closure::wrap(Box::new(move |e: CloseEvent| {
            log::info!("WebSocket disconnected (code {})", e.code());
            if let Some(live) = Self::from_weak(&weak) {
                live.handle_close();
            }
        }) as Box<dyn FnMut(CloseEvent)>);
        ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));

        // close always follows error; reconnect is handled there
        let onerror = Closure::wrap(Box::new(move |_: Event| {
            log::error!("WebSocket error");
        }) as Box<dyn FnMut(Event)>);
        ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        *self.inner.socket.borrow_mut() = Some(ws);
        *self.inner.handlers.borrow_mut() = Some(SocketHandlers {
            _onopen: onopen,
            _onmessage: onmessage,
            _onclose: onclose,
            _onerror: onerror,
        });
    }

    fn detach_socket(&self) {
        if let Some(old) = self.inner.socket.borrow_mut().take() {
            old.set_onopen(None);
            old.set_onmessage(None);
            old.set_onclose(None);
            old.set_onerror(None);
        }
        self.inner.handlers.borrow_mut().take();
    }

    pub fn handle_open(&self) {
        log::info!("WebSocket connected");
        self.inner.channel.borrow_mut().opened();
    }

    /// Socket closed (or never opened): back off and try again while the
    /// reconnect budget lasts.
    pub fn handle_close(&self) {
        let next = self.inner.channel.borrow_mut().closed();
        match next {
            Some(delay) => {
                log::info!(
                    "Attempting reconnect in {}ms (attempt {})",
                    delay,
                    self.reconnect_attempts()
                );
                let this = self.clone();
                Timeout::new(delay, move || this.connect()).forget();
            }
            None => {
                log::warn!("Live channel gave up after {} attempts; polling only", self.reconnect_attempts());
            }
        }
    }

    pub fn handle_text(&self, text: &str) {
        match InboundMessage::parse(text) {
            Ok(message) => self.dispatch(message),
            Err(e) => log::error!("Dropping malformed live message: {}", e),
        }
    }

    fn dispatch(&self, message: InboundMessage) {
        dispatch(
            message,
            self.inner.sink.as_ref(),
            self.inner.notifier.as_deref(),
            &self.inner.config.notification_title,
        );
    }

    /// Both poll loops run for the page lifetime regardless of socket state.
    pub fn start_polling(&self) {
        let this = self.clone();
        Interval::new(self.inner.config.leaderboard_poll_ms, move || {
            let this = this.clone();
            spawn_local(async move { this.poll_leaderboard().await });
        })
        .forget();

        let this = self.clone();
        Interval::new(self.inner.config.notifications_poll_ms, move || {
            let this = this.clone();
            spawn_local(async move { this.poll_notifications().await });
        })
        .forget();
    }

    pub async fn poll_leaderboard(&self) {
        match api::fetch_leaderboard(&self.inner.config).await {
            Ok(entries) => self.dispatch(InboundMessage::LeaderboardUpdate(entries)),
            Err(e) => log::error!("Error polling leaderboard: {}", e),
        }
    }

    pub async fn poll_notifications(&self) {
        match api::fetch_notifications(&self.inner.config).await {
            Ok(summary) => {
                log::debug!(
                    "{} unread, {} recent notifications",
                    summary.unread_count,
                    summary.notifications.len()
                );
                self.inner.sink.set_unread(summary.unread_count);
            }
            Err(e) => log::error!("Error polling notifications: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        events: RefCell<Vec<String>>,
    }

    impl UpdateSink for RecordingSink {
        fn replace_leaderboard(&self, entries: Vec<LeaderboardEntry>) {
            let names: Vec<String> = entries.into_iter().map(|e| e.name).collect();
            self.events.borrow_mut().push(format!("leaderboard:{}", names.join(",")));
        }

        fn set_unread(&self, count: u32) {
            self.events.borrow_mut().push(format!("unread:{}", count));
        }

        fn toast(&self, message: &str) {
            self.events.borrow_mut().push(format!("toast:{}", message));
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        shown: RefCell<Vec<(String, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, body: &str) {
            self.shown.borrow_mut().push((title.to_string(), body.to_string()));
        }
    }

    #[test]
    fn leaderboard_update_replaces_list() {
        let sink = RecordingSink::default();
        let msg = InboundMessage::parse(
            r#"{"type":"leaderboard_update","data":[{"name":"Slytherin","points":90,"crest":""},{"name":"Gryffindor","points":80,"crest":""}]}"#,
        )
        .unwrap();
        dispatch(msg, &sink, None, "Evoke Update");
        assert_eq!(*sink.events.borrow(), vec!["leaderboard:Slytherin,Gryffindor".to_string()]);
    }

    #[test]
    fn notification_shows_platform_notice_and_toast() {
        let sink = RecordingSink::default();
        let notifier = RecordingNotifier::default();
        dispatch(InboundMessage::Notification("Quidditch at 5".into()), &sink, Some(&notifier), "Evoke Update");
        assert_eq!(*sink.events.borrow(), vec!["toast:Quidditch at 5".to_string()]);
        assert_eq!(
            *notifier.shown.borrow(),
            vec![("Evoke Update".to_string(), "Quidditch at 5".to_string())]
        );
    }

    #[test]
    fn notification_without_notifier_still_toasts() {
        let sink = RecordingSink::default();
        dispatch(InboundMessage::Notification("hi".into()), &sink, None, "Evoke Update");
        assert_eq!(*sink.events.borrow(), vec!["toast:hi".to_string()]);
    }

    #[test]
    fn unknown_kind_touches_nothing() {
        let sink = RecordingSink::default();
        let notifier = RecordingNotifier::default();
        let msg = InboundMessage::parse(r#"{"type":"unknown_kind"}"#).unwrap();
        dispatch(msg, &sink, Some(&notifier), "Evoke Update");
        assert!(sink.events.borrow().is_empty());
        assert!(notifier.shown.borrow().is_empty());
    }

    #[test]
    fn leaderboard_frame_without_data_leaves_board_alone() {
        let sink = RecordingSink::default();
        let msg = InboundMessage::parse(r#"{"type":"leaderboard_update"}"#).unwrap();
        dispatch(msg, &sink, None, "Evoke Update");
        assert!(sink.events.borrow().is_empty());
    }

    #[test]
    fn tracker_gives_up_after_five_closes() {
        let mut channel = ChannelTracker::new(ReconnectPolicy::default());
        channel.connecting();
        assert_eq!(channel.state(), ChannelState::Connecting);

        let delays: Vec<Option<u32>> = (0..6).map(|_| channel.closed()).collect();
        assert_eq!(
            delays,
            vec![Some(2_000), Some(4_000), Some(8_000), Some(16_000), Some(30_000), None]
        );
        assert_eq!(channel.attempts(), 5);
        assert_eq!(channel.state(), ChannelState::Disconnected);
    }

    #[test]
    fn tracker_open_resets_attempts() {
        let mut channel = ChannelTracker::new(ReconnectPolicy::default());
        channel.closed();
        channel.closed();
        channel.connecting();
        channel.opened();
        assert_eq!(channel.state(), ChannelState::Connected);
        assert_eq!(channel.attempts(), 0);
        assert_eq!(channel.closed(), Some(2_000));
    }

    #[test]
    fn feed_open_marks_connected_and_resets() {
        let live = LiveUpdates::new(Rc::new(Config::default()), Rc::new(RecordingSink::default()), None);
        live.inner.channel.borrow_mut().closed();
        live.handle_open();
        assert_eq!(live.state(), ChannelState::Connected);
        assert_eq!(live.reconnect_attempts(), 0);
    }

    #[test]
    fn channel_url_follows_page_scheme() {
        assert_eq!(channel_url("https:", "evoke.example", "/ws/leaderboard/"), "wss://evoke.example/ws/leaderboard/");
        assert_eq!(channel_url("http:", "localhost:8000", "/ws/leaderboard/"), "ws://localhost:8000/ws/leaderboard/");
    }

    #[test]
    fn new_feed_starts_disconnected() {
        let live = LiveUpdates::new(Rc::new(Config::default()), Rc::new(RecordingSink::default()), None);
        assert_eq!(live.state(), ChannelState::Disconnected);
        assert_eq!(live.reconnect_attempts(), 0);
    }
}
