//! Checklist marker grammar.
//!
//! ```text
//! checkbox := "[" marker "]"
//! marker   := " " | "-" | "x" | "X" | "!"
//! ```
//!
//! The table below is the whole mapping. Rendering always emits the first
//! marker listed for a status.

use taskpanel_core::PlanStatus;

/// Marker character ↔ status, exhaustive.
pub const MARKERS: &[(char, PlanStatus)] = &[
    (' ', PlanStatus::ToDo),
    ('-', PlanStatus::InProgress),
    ('x', PlanStatus::Completed),
    ('X', PlanStatus::Completed),
    ('!', PlanStatus::Blocked),
];

/// Why a checkbox could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerError {
    /// No `[` … `]` at the start of the item.
    MissingCheckbox,
    /// The brackets hold something other than exactly one known marker.
    Unknown(String),
}

/// Marker character for `status`.
pub fn marker_for(status: PlanStatus) -> char {
    match status {
        PlanStatus::ToDo => ' ',
        PlanStatus::InProgress => '-',
        PlanStatus::Completed => 'x',
        PlanStatus::Blocked => '!',
    }
}

/// Status encoded by `marker`, if it is part of the grammar.
pub fn status_for(marker: char) -> Option<PlanStatus> {
    MARKERS
        .iter()
        .find(|(m, _)| *m == marker)
        .map(|(_, status)| *status)
}

/// Split `"[x] rest"` into the status and `"rest"`.
///
/// `item` is the text after the list bullet.
pub fn parse_checkbox(item: &str) -> Result<(PlanStatus, &str), MarkerError> {
    let Some(body) = item.strip_prefix('[') else {
        return Err(MarkerError::MissingCheckbox);
    };
    let Some(close) = body.find(']') else {
        return Err(MarkerError::MissingCheckbox);
    };
    let inner = &body[..close];
    let rest = &body[close + 1..];

    let mut chars = inner.chars();
    let status = match (chars.next(), chars.next()) {
        (Some(c), None) => status_for(c),
        _ => None,
    };
    match status {
        Some(status) => Ok((status, rest.strip_prefix(' ').unwrap_or(rest))),
        None => Err(MarkerError::Unknown(inner.to_string())),
    }
}
