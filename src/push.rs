use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    Notification, NotificationOptions, NotificationPermission, PushSubscription,
    PushSubscriptionOptionsInit, ServiceWorkerRegistration, Window,
};

use crate::api;
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::live::Notifier;
use crate::vapid::decode_base64url;

/// Page-lifetime push state. Never persisted.
#[derive(Default)]
struct PushState {
    registration: Option<ServiceWorkerRegistration>,
    subscription: Option<PushSubscription>,
    is_subscribed: bool,
}

/// Service worker registration, push subscription and local notifications.
#[derive(Clone)]
pub struct PushNotifications {
    config: Rc<Config>,
    state: Rc<RefCell<PushState>>,
}

fn has_property(target: &JsValue, name: &str) -> bool {
    js_sys::Reflect::has(target, &JsValue::from_str(name)).unwrap_or(false)
}

fn push_supported(window: &Window) -> bool {
    has_property(&window.navigator(), "serviceWorker") && has_property(window, "PushManager")
}

fn notifications_supported(window: &Window) -> bool {
    has_property(window, "Notification")
}

impl PushNotifications {
    pub fn new(config: Rc<Config>) -> Self {
        Self { config, state: Rc::new(RefCell::new(PushState::default())) }
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.borrow().is_subscribed
    }

    fn registration(&self) -> Result<ServiceWorkerRegistration> {
        self.state
            .borrow()
            .registration
            .clone()
            .ok_or(ClientError::Unsupported("service worker registration"))
    }

    /// Kick off `initialize` in the background; failures only get logged.
    pub fn start(&self) {
        let this = self.clone();
        spawn_local(async move {
            if let Err(e) = this.initialize().await {
                log::error!("Push setup failed: {}", e);
            }
        });
    }

    /// Register the worker and make sure the server holds a subscription.
    /// Browsers without push support leave the component inert.
    pub async fn initialize(&self) -> Result<()> {
        let window = web_sys::window().ok_or(ClientError::Unsupported("window"))?;
        if !push_supported(&window) {
            log::warn!("Push messaging is not supported");
            return Ok(());
        }

        let promise = window.navigator().service_worker().register(&self.config.worker_script);
        let registration: ServiceWorkerRegistration = JsFuture::from(promise).await?.dyn_into()?;
        log::info!("Service worker registered at {}", registration.scope());
        self.state.borrow_mut().registration = Some(registration);

        self.check_subscription_status().await
    }

    pub async fn check_subscription_status(&self) -> Result<()> {
        let registration = self.registration()?;
        let current = JsFuture::from(registration.push_manager()?.get_subscription()?).await?;
        let subscription = if current.is_null() || current.is_undefined() {
            None
        } else {
            Some(current.dyn_into::<PushSubscription>()?)
        };

        {
            let mut state = self.state.borrow_mut();
            state.is_subscribed = subscription.is_some();
            state.subscription = subscription.clone();
        }

        match subscription {
            Some(subscription) => {
                log::info!("User is subscribed");
                self.upload_subscription(Some(&subscription)).await
            }
            None => {
                log::info!("User is not subscribed");
                self.subscribe().await
            }
        }
    }

    /// Ask the push service for a new subscription. No retry on failure.
    pub async fn subscribe(&self) -> Result<()> {
        let registration = self.registration()?;
        let key = decode_base64url(&self.config.vapid_public_key)?;
        let key = js_sys::Uint8Array::from(key.as_slice());

        let options = PushSubscriptionOptionsInit::new();
        options.set_user_visible_only(true);
        options.set_application_server_key(&key);

        let promise = registration.push_manager()?.subscribe_with_options(&options)?;
        let subscription: PushSubscription = JsFuture::from(promise).await?.dyn_into()?;
        log::info!("User subscribed via {}", subscription.endpoint());

        {
            let mut state = self.state.borrow_mut();
            state.is_subscribed = true;
            state.subscription = Some(subscription.clone());
        }

        self.upload_subscription(Some(&subscription)).await
    }

    /// Send the subscription to the server. Nothing to do without one.
    pub async fn upload_subscription(&self, subscription: Option<&PushSubscription>) -> Result<()> {
        let Some(subscription) = subscription else {
            return Ok(());
        };
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or(ClientError::Unsupported("document"))?;
        let csrf = api::csrf_token(&document)?;
        let json: String = js_sys::JSON::stringify(subscription)?.into();

        let response = api::save_subscription(&self.config, &csrf, &json).await?;
        if response.is_success() {
            log::info!("Subscription saved: {}", response.status);
        } else {
            log::error!(
                "Server rejected subscription: {}",
                response.message.as_deref().unwrap_or(&response.status)
            );
        }
        Ok(())
    }

    /// Show the browser permission prompt. `false` when denied or unsupported.
    pub async fn request_permission() -> bool {
        match request_permission_inner().await {
            Ok(granted) => granted,
            Err(e) => {
                log::error!("Permission request failed: {}", e);
                false
            }
        }
    }

    fn notification_options(&self, body: &str, icon: Option<&str>) -> NotificationOptions {
        let options = NotificationOptions::new();
        options.set_body(body);
        options.set_icon(icon.unwrap_or(&self.config.notification_icon));
        options.set_badge(&self.config.notification_badge);
        options.set_tag(&self.config.notification_tag);
        options.set_renotify(true);
        options
    }

    /// Immediate notification; silently skipped without granted permission.
    pub fn show_local_notification(&self, title: &str, body: &str, icon: Option<&str>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        if !notifications_supported(&window) || Notification::permission() != NotificationPermission::Granted {
            return;
        }

        let options = self.notification_options(body, icon);
        let registration = self.state.borrow().registration.clone();
        let result = match registration {
            Some(registration) => show_persistent(&registration, title, &options),
            None => show_in_page(&window, title, &options),
        };
        if let Err(e) = result {
            log::error!("Could not show notification: {}", e);
        }
    }
}

impl Notifier for PushNotifications {
    fn notify(&self, title: &str, body: &str) {
        self.show_local_notification(title, body, None);
    }
}

async fn request_permission_inner() -> Result<bool> {
    let window = web_sys::window().ok_or(ClientError::Unsupported("window"))?;
    if !notifications_supported(&window) {
        return Ok(false);
    }
    let result = JsFuture::from(Notification::request_permission()?).await?;
    Ok(result.as_string().as_deref() == Some("granted"))
}

/// The `view` / `close` buttons attached to worker notifications.
pub fn notification_actions() -> Result<js_sys::Array> {
    let actions = js_sys::Array::new();
    for (action, title) in [("view", "View"), ("close", "Close")] {
        let entry = js_sys::Object::new();
        js_sys::Reflect::set(&entry, &"action".into(), &action.into())?;
        js_sys::Reflect::set(&entry, &"title".into(), &title.into())?;
        actions.push(&entry);
    }
    Ok(actions)
}

// Action buttons only exist on worker-owned notifications; clicks are the
// worker's business.
fn show_persistent(registration: &ServiceWorkerRegistration, title: &str, options: &NotificationOptions) -> Result<()> {
    js_sys::Reflect::set(options, &"actions".into(), &notification_actions()?.into())?;
    let promise = registration.show_notification_with_options(title, options)?;
    spawn_local(async move {
        if let Err(e) = JsFuture::from(promise).await {
            log::error!("showNotification failed: {}", ClientError::from(e));
        }
    });
    Ok(())
}

fn show_in_page(window: &Window, title: &str, options: &NotificationOptions) -> Result<()> {
    let notification = Notification::new_with_options(title, options)?;
    let target = notification.clone();
    let window = window.clone();
    let onclick = Closure::wrap(Box::new(move || {
        let _ = window.focus();
        target.close();
    }) as Box<dyn FnMut()>);
    notification.set_onclick(Some(onclick.as_ref().unchecked_ref()));
    onclick.forget();
    Ok(())
}
