//! Record types shared by every store backend.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version stamped into `schema_meta` on first initialize.
pub(crate) const CURRENT_SCHEMA_VERSION: u32 = 1;

/// One persisted observation.
///
/// `id` and `observed_at` are assigned by the store on append and never
/// supplied by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub primary_label: String,
    pub secondary_label: String,
    /// RFC 3339 UTC timestamp with millisecond precision.
    pub observed_at: String,
}

/// A fetched observation that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub primary_label: String,
    pub secondary_label: String,
}

impl Candidate {
    pub fn new(primary_label: impl Into<String>, secondary_label: impl Into<String>) -> Self {
        Self {
            primary_label: primary_label.into(),
            secondary_label: secondary_label.into(),
        }
    }

    /// Whether this candidate carries the same dedup key as `record`.
    ///
    /// Only `secondary_label` is compared. A change in `primary_label`
    /// alone does not count as a new observation.
    pub fn same_key_as(&self, record: &Record) -> bool {
        self.secondary_label == record.secondary_label
    }
}

/// Ordering for [`RecordStore::list_all`](super::RecordStore::list_all).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListOrder {
    /// Insertion order (ascending `id`).
    #[default]
    Ascending,
    /// Most recent first.
    Descending,
}

/// Current UTC time formatted like `2024-05-01T12:00:00.123Z`.
///
/// Fixed-width, so lexical order matches chronological order.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
