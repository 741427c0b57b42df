use web_sys::Document;

const META_PREFIX: &str = "evoke:";

/// Runtime settings for both components.
///
/// Defaults match the routes the Django site serves; any value can be
/// overridden per page with `<meta name="evoke:<key>" content="...">`.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub worker_script: String,
    pub save_subscription_url: String,
    pub leaderboard_url: String,
    pub notifications_url: String,
    pub mark_read_url: String,
    pub live_channel_path: String,
    /// Base64url public key substituted into the page by the server.
    pub vapid_public_key: String,
    pub notification_title: String,
    pub notification_icon: String,
    pub notification_badge: String,
    pub notification_tag: String,
    pub leaderboard_poll_ms: u32,
    pub notifications_poll_ms: u32,
    pub reconnect_base_ms: u32,
    pub reconnect_cap_ms: u32,
    pub max_reconnect_attempts: u32,
    pub toast_lifetime_ms: u32,
    pub log_level: log::Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_script: "/serviceworker.js".to_string(),
            save_subscription_url: "/notifications/save-subscription/".to_string(),
            leaderboard_url: "/api/leaderboard/".to_string(),
            notifications_url: "/notifications/user-notifications/".to_string(),
            // assumed route; override with `evoke:mark-read-url`
            mark_read_url: "/notifications/mark-read/".to_string(),
            live_channel_path: "/ws/leaderboard/".to_string(),
            vapid_public_key: String::new(),
            notification_title: "Evoke Update".to_string(),
            notification_icon: "/static/images/logo.png".to_string(),
            notification_badge: "/static/images/badge.png".to_string(),
            notification_tag: "evoke-notification".to_string(),
            leaderboard_poll_ms: 30_000,
            notifications_poll_ms: 60_000,
            reconnect_base_ms: 1_000,
            reconnect_cap_ms: 30_000,
            max_reconnect_attempts: 5,
            toast_lifetime_ms: 5_000,
            log_level: log::Level::Info,
        }
    }
}

impl Config {
    /// Defaults overlaid with whatever `evoke:*` meta tags the page carries.
    pub fn from_document(document: &Document) -> Self {
        let mut config = Self::default();
        for key in OVERRIDABLE_KEYS {
            if let Some(value) = read_meta(document, key) {
                config.apply(key, &value);
            }
        }
        config
    }

    /// Apply one override. Unknown keys and unparsable numbers are ignored.
    pub fn apply(&mut self, key: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        match key {
            "worker-script" => self.worker_script = value.to_string(),
            "save-subscription-url" => self.save_subscription_url = value.to_string(),
            "leaderboard-url" => self.leaderboard_url = value.to_string(),
            "notifications-url" => self.notifications_url = value.to_string(),
            "mark-read-url" => self.mark_read_url = value.to_string(),
            "live-channel-path" => self.live_channel_path = value.to_string(),
            "vapid-public-key" => self.vapid_public_key = value.to_string(),
            "notification-title" => self.notification_title = value.to_string(),
            "notification-icon" => self.notification_icon = value.to_string(),
            "leaderboard-poll-ms" => set_number(&mut self.leaderboard_poll_ms, value),
            "notifications-poll-ms" => set_number(&mut self.notifications_poll_ms, value),
            "max-reconnect-attempts" => set_number(&mut self.max_reconnect_attempts, value),
            "log-level" => {
                if let Ok(level) = value.parse() {
                    self.log_level = level;
                }
            }
            _ => {}
        }
    }

    pub fn mark_read_url_for(&self, notification_id: u32) -> String {
        format!("{}/{}/", self.mark_read_url.trim_end_matches('/'), notification_id)
    }
}

const OVERRIDABLE_KEYS: &[&str] = &[
    "worker-script",
    "save-subscription-url",
    "leaderboard-url",
    "notifications-url",
    "mark-read-url",
    "live-channel-path",
    "vapid-public-key",
    "notification-title",
    "notification-icon",
    "leaderboard-poll-ms",
    "notifications-poll-ms",
    "max-reconnect-attempts",
    "log-level",
];

fn set_number(slot: &mut u32, value: &str) {
    if let Ok(n) = value.parse::<u32>() {
        if n > 0 {
            *slot = n;
        }
    }
}

fn read_meta(document: &Document, key: &str) -> Option<String> {
    let selector = format!("meta[name=\"{}{}\"]", META_PREFIX, key);
    document
        .query_selector(&selector)
        .ok()
        .flatten()
        .and_then(|meta| meta.get_attribute("content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_server_routes() {
        let config = Config::default();
        assert_eq!(config.leaderboard_url, "/api/leaderboard/");
        assert_eq!(config.notifications_url, "/notifications/user-notifications/");
        assert_eq!(config.save_subscription_url, "/notifications/save-subscription/");
        assert_eq!(config.live_channel_path, "/ws/leaderboard/");
        assert_eq!(config.leaderboard_poll_ms, 30_000);
        assert_eq!(config.notifications_poll_ms, 60_000);
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.toast_lifetime_ms, 5_000);
    }

    #[test]
    fn overrides_apply_and_bad_values_are_ignored() {
        let mut config = Config::default();
        config.apply("vapid-public-key", "  BKey_-x  ");
        config.apply("leaderboard-poll-ms", "15000");
        config.apply("notifications-poll-ms", "soon");
        config.apply("max-reconnect-attempts", "0");
        config.apply("log-level", "debug");
        config.apply("no-such-key", "x");

        assert_eq!(config.vapid_public_key, "BKey_-x");
        assert_eq!(config.leaderboard_poll_ms, 15_000);
        assert_eq!(config.notifications_poll_ms, 60_000);
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.log_level, log::Level::Debug);
    }

    #[test]
    fn mark_read_url_appends_id() {
        let config = Config::default();
        assert_eq!(config.mark_read_url_for(42), "/notifications/mark-read/42/");
    }
}
