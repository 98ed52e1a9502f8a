//! The single approval checkbox of a proposal comment.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::fence::first_unfenced;

pub const CHECKBOX_LABEL: &str = "Apply this change";
pub const UNCHECKED_LINE: &str = "- [ ] Apply this change";
pub const CHECKED_LINE: &str = "- [x] Apply this change";

static CHECKBOX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t]*[-*] \[)([ xX])(\] Apply this change)([ \t]*\r?)$")
        .expect("checkbox pattern compiles")
});

/// Presence and state of the checkbox line.
///
/// `Absent` is distinct from `Unchecked`: a comment rendered without a
/// checkbox is neither an approval nor a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckboxState {
    Absent,
    Unchecked,
    Checked,
}

impl CheckboxState {
    pub fn is_checked(self) -> bool {
        self == CheckboxState::Checked
    }
}

/// State of the first checkbox line outside fenced content.
pub fn checkbox_state(body: &str) -> CheckboxState {
    match first_unfenced(&CHECKBOX_RE, body).and_then(|c| c.get(2)) {
        None => CheckboxState::Absent,
        Some(mark) if mark.as_str() == " " => CheckboxState::Unchecked,
        Some(_) => CheckboxState::Checked,
    }
}

/// Set the checkbox line to `checked`. Bodies without one are returned
/// unchanged.
pub fn set_checkbox(body: &str, checked: bool) -> String {
    let Some(mark) = first_unfenced(&CHECKBOX_RE, body).and_then(|c| c.get(2)) else {
        return body.to_string();
    };
    let value = if checked { "x" } else { " " };
    format!("{}{value}{}", &body[..mark.start()], &body[mark.end()..])
}

/// Drop the checkbox line entirely.
pub fn remove_checkbox(body: &str) -> String {
    let Some(found) = first_unfenced(&CHECKBOX_RE, body).and_then(|c| c.get(0)) else {
        return body.to_string();
    };
    let mut end = found.end();
    if body[end..].starts_with('\n') {
        end += 1;
    }
    format!("{}{}", &body[..found.start()], &body[end..])
}
