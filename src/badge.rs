use web_sys::Element;

use crate::error::Result;

pub const HIDDEN_CLASS: &str = "hidden";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BadgeState {
    pub text: String,
    pub hidden: bool,
}

impl BadgeState {
    pub fn for_count(count: u32) -> Self {
        Self { text: count.to_string(), hidden: count == 0 }
    }
}

/// Write the unread count into the server-rendered badge element.
pub fn apply_badge(badge: &Element, count: u32) -> Result<()> {
    let state = BadgeState::for_count(count);
    badge.set_text_content(Some(&state.text));
    badge.class_list().toggle_with_force(HIDDEN_CLASS, state.hidden)?;
    Ok(())
}
