use thiserror::Error;
use wasm_bindgen::JsValue;

/// Everything that can go wrong talking to the browser or the server.
///
/// None of these ever reach the user; the outer tasks log them and carry on.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClientError {
    #[error("{0} is not supported by this browser")]
    Unsupported(&'static str),

    #[error("platform call failed: {0}")]
    Js(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("bad JSON: {0}")]
    Json(String),

    #[error("invalid application server key: {0}")]
    InvalidKey(String),

    #[error("element `{0}` not found on page")]
    MissingElement(&'static str),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl From<JsValue> for ClientError {
    fn from(value: JsValue) -> Self {
        let text = value
            .as_string()
            .or_else(|| {
                js_sys::Reflect::get(&value, &JsValue::from_str("message"))
                    .ok()
                    .and_then(|m| m.as_string())
            })
            .unwrap_or_else(|| format!("{:?}", value));
        ClientError::Js(text)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Json(e.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for ClientError {
    fn from(e: serde_wasm_bindgen::Error) -> Self {
        ClientError::Json(e.to_string())
    }
}

impl From<base64::DecodeError> for ClientError {
    fn from(e: base64::DecodeError) -> Self {
        ClientError::InvalidKey(e.to_string())
    }
}
