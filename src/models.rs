use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// How a message's `Date` header is turned into a comparable timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateMode {
    /// Keep the sender's wall-clock time and drop the offset.
    #[default]
    Naive,
    /// Convert the sender's instant into the local zone first.
    Local,
}

/// The trailing window a message must fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    pub start: NaiveDateTime,
}

impl SearchWindow {
    /// Window ending at `now` and reaching back `minutes`.
    ///
    /// `None` for a negative span or one that leaves the representable range.
    pub fn ending_at(now: NaiveDateTime, minutes: i64) -> Option<Self> {
        if minutes < 0 {
            return None;
        }
        let start = now.checked_sub_signed(Duration::try_minutes(minutes)?)?;
        Some(SearchWindow { start })
    }

    /// Day-granularity bound for the server-side `SINCE` search.
    pub fn since_day(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        timestamp >= self.start
    }
}

/// A fetched message that parsed cleanly, kept only while choosing the newest match.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: u32,
    pub timestamp: NaiveDateTime,
    /// `Date` header exactly as sent.
    pub date: String,
    /// Decoded `Subject` header.
    pub subject: String,
    pub raw: Vec<u8>,
}

/// Decoded attachment data ready to be written out.
#[derive(Debug, Clone)]
pub struct AttachmentData {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl AttachmentData {
    pub fn is_image(&self) -> bool {
        self.mime_type.to_ascii_lowercase().starts_with("image/")
    }
}
