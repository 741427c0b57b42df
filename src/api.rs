use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, Headers, HtmlInputElement, Request, RequestInit, RequestMode, Response};

use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::types::{LeaderboardEntry, NotificationSummary, StatusResponse};

const CSRF_FIELD_SELECTOR: &str = "[name=csrfmiddlewaretoken]";

/// Read Django's anti-forgery token from the hidden form field.
pub fn csrf_token(document: &Document) -> Result<String> {
    let field = document
        .query_selector(CSRF_FIELD_SELECTOR)?
        .ok_or(ClientError::MissingElement("csrfmiddlewaretoken"))?;
    let input: HtmlInputElement = field
        .dyn_into()
        .map_err(|_| ClientError::MissingElement("csrfmiddlewaretoken"))?;
    Ok(input.value())
}

fn json_headers(csrf: Option<&str>) -> Result<Headers> {
    let headers = Headers::new()?;
    headers.set("Accept", "application/json")?;
    headers.set("Content-Type", "application/json")?;
    if let Some(token) = csrf {
        headers.set("X-CSRFToken", token)?;
    }
    Ok(headers)
}

fn create_request_init(method: &str, body: Option<&str>, headers: &Headers) -> RequestInit {
    let opts = RequestInit::new();
    opts.set_method(method);
    opts.set_mode(RequestMode::SameOrigin);
    if let Some(b) = body {
        opts.set_body(&JsValue::from_str(b));
    }
    opts.set_headers(&JsValue::from(headers));
    opts
}

async fn send_json<T: DeserializeOwned>(
    method: &str,
    url: &str,
    body: Option<&str>,
    csrf: Option<&str>,
) -> Result<T> {
    let window = web_sys::window().ok_or(ClientError::Unsupported("window"))?;

    let headers = json_headers(csrf)?;
    let opts = create_request_init(method, body, &headers);
    let request = Request::new_with_str_and_init(url, &opts)?;

    let resp_value = JsFuture::from(window.fetch_with_request(&request)).await?;
    let resp: Response = resp_value.dyn_into()?;

    if !resp.ok() {
        return Err(ClientError::Http { status: resp.status(), url: url.to_string() });
    }

    let json = JsFuture::from(resp.json()?).await?;
    Ok(serde_wasm_bindgen::from_value(json)?)
}

/// `GET` the current house standings, ordered by rank.
pub async fn fetch_leaderboard(config: &Config) -> Result<Vec<LeaderboardEntry>> {
    send_json("GET", &config.leaderboard_url, None, None).await
}

/// `GET` the unread count plus the most recent notifications.
pub async fn fetch_notifications(config: &Config) -> Result<NotificationSummary> {
    send_json("GET", &config.notifications_url, None, None).await
}

/// `POST {subscription}` so the server can push to this browser.
///
/// `subscription_json` is the platform's own JSON serialisation of the
/// subscription object.
pub async fn save_subscription(config: &Config, csrf: &str, subscription_json: &str) -> Result<StatusResponse> {
    let subscription: serde_json::Value = serde_json::from_str(subscription_json)?;
    let body = serde_json::json!({ "subscription": subscription }).to_string();
    send_json("POST", &config.save_subscription_url, Some(&body), Some(csrf)).await
}

pub async fn mark_notification_read(config: &Config, csrf: &str, notification_id: u32) -> Result<StatusResponse> {
    let url = config.mark_read_url_for(notification_id);
    send_json("POST", &url, None, Some(csrf)).await
}
