use gloo_timers::callback::Timeout;
use leptos::*;

#[derive(Clone, Debug, PartialEq)]
pub struct Toast {
    pub id: u32,
    pub message: String,
}

/// Toasts currently on screen, oldest first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToastQueue {
    toasts: Vec<Toast>,
    next_id: u32,
}

impl ToastQueue {
    pub fn push(&mut self, message: &str) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.toasts.push(Toast { id, message: message.to_string() });
        id
    }

    /// Remove one toast. `false` if it was already gone.
    pub fn dismiss(&mut self, id: u32) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        before != self.toasts.len()
    }

    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

/// Reactive handle to the toast queue.
#[derive(Clone, Copy)]
pub struct Toasts {
    queue: RwSignal<ToastQueue>,
    lifetime_ms: u32,
}

impl Toasts {
    pub fn new(lifetime_ms: u32) -> Self {
        Self { queue: create_rw_signal(ToastQueue::default()), lifetime_ms }
    }

    /// Show a toast; its own timer removes it after `lifetime_ms`.
    pub fn show(&self, message: &str) -> u32 {
        let mut id = 0;
        self.queue.update(|q| id = q.push(message));
        let queue = self.queue;
        Timeout::new(self.lifetime_ms, move || {
            queue.update(|q| {
                q.dismiss(id);
            });
        })
        .forget();
        id
    }

    pub fn current(&self) -> Vec<Toast> {
        self.queue.with(|q| q.toasts().to_vec())
    }
}

/// Renders the toast stack; mounted once on `<body>`.
#[component]
pub fn ToastHost(toasts: Toasts) -> impl IntoView {
    view! {
        <div class="fixed top-4 right-4 z-50 space-y-2">
            <For
                each=move || toasts.current()
                key=|toast| toast.id
                children=move |toast| view! {
                    <div class="bg-black/80 text-white p-4 rounded-lg border border-accent shadow-lg max-w-sm">
                        <div class="flex items-center space-x-3">
                            <div class="w-3 h-3 bg-accent rounded-full animate-pulse"></div>
                            <p>{toast.message}</p>
                        </div>
                    </div>
                }
            />
        </div>
    }
}
