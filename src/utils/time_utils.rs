use chrono::{DateTime, TimeZone};
use std::time::Duration;

use crate::shared::constants;

/// Clip length as `MM:SS`, zero padded. Minutes are not wrapped at the hour.
pub fn format_length(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    format!("{:02}:{:02}", millis / 60_000, (millis % 60_000) / 1000)
}

/// Timestamp used in clip, thumbnail and log names: `yyyy-MM-dd--hh-mm-ss`.
pub fn clip_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(constants::CLIP_TIMESTAMP_FORMAT).to_string()
}
