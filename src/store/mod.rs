//! Entry store: the persistent, concurrency-safe mapping from
//! `(device_id, content)` to recorded file entries (§4.3).

pub mod sqlite;

use crate::error::StoreError;
use crate::model::Entry;

/// Any conforming backend. `store_entry` takes `&self`, not `&mut self`,
/// because it must be safe to call from many concurrent collector tasks;
/// implementations serialize their own internal mutation (a mutex around a
/// batching counter, in the reference backend).
pub trait EntryStore: Send + Sync {
    /// Acquire resources. Idempotent when already open.
    fn open(&self) -> Result<(), StoreError>;

    /// Commit all pending writes and release resources ("close-on-success").
    fn close(&self) -> Result<(), StoreError>;

    /// Discard pending writes and release resources ("close-on-failure").
    fn abort(&self) -> Result<(), StoreError>;

    /// Append one entry. Duplicates (same content tuple, same device, same
    /// path) are logged at error level and otherwise ignored; they never
    /// surface as an `Err`. Loss of store connectivity is the only fatal
    /// condition and is the only thing this returns `Err` for.
    fn store_entry(&self, entry: &Entry) -> Result<(), StoreError>;

    /// Per-device uniques view (§3): one representative path per
    /// content-hash group, lexicographically smallest first. Only
    /// meaningful once the collect phase for `device_id` has completed
    /// (invariant I6). `chunk_size` is a hint for the backend's internal
    /// fetch granularity; the full, ordered result is always returned.
    fn get_uniques_for_device(&self, device_id: u32, chunk_size: i64) -> Result<Vec<String>, StoreError>;
}
