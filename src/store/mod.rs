//! Append-only record store.
//!
//! - `types`: [`Record`], [`Candidate`], [`ListOrder`] and timestamp helpers.
//! - `schema`: SQLite DDL.
//! - `sqlite`: [`SqliteRecordStore`], the durable backend.
//!
//! Callers hold the store as an `Arc<dyn RecordStore>` so the poll loop and
//! the display layer share one handle, and tests can substitute a fake.

pub(crate) mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::SqliteRecordStore;
pub use types::{Candidate, ListOrder, Record, now_iso8601};

use crate::error::Result;

/// Storage contract used by the poll loop and presentation readers.
///
/// There is deliberately no update or delete operation.
pub trait RecordStore: Send + Sync {
    /// Ensure the backing medium is open and the schema exists. Idempotent.
    fn initialize(&self) -> Result<()>;

    /// Persist a new record, assigning its `id` and `observed_at`.
    ///
    /// Returns only after the write has completed or failed.
    fn append(&self, primary_label: &str, secondary_label: &str) -> Result<Record>;

    /// The record with the greatest `id`, if any.
    fn latest(&self) -> Result<Option<Record>>;

    /// Every record in the requested order.
    fn list_all(&self, order: ListOrder) -> Result<Vec<Record>>;

    /// Number of stored records.
    fn count(&self) -> Result<u64> {
        let n = self.list_all(ListOrder::Ascending)?.len();
        Ok(u64::try_from(n).unwrap_or(u64::MAX))
    }
}
