//! Textual timestamp normalization.

use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Interpret `value` as an instant if it is an RFC 3339 timestamp or a bare
/// `YYYY-MM-DD` date (taken as midnight UTC).
#[must_use]
pub fn as_instant(value: &Value) -> Option<OffsetDateTime> {
    let text = value.as_str()?;
    if let Ok(instant) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(instant);
    }
    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}
