use std::sync::Arc;

use crate::record::Record;

/// Optional capability exposed by whatever holds a record.
///
/// A record's `owner` is a non-owning [`Weak`](std::sync::Weak) handle typed
/// against this trait; absence of an owner is an explicit `None`, never a
/// runtime capability probe. [`RecordSet`](crate::RecordSet) implements this
/// so that a record's `create`/`destroy` can keep the holding set consistent
/// under optimistic mutation.
pub trait Owner: Send + Sync {
    /// The collection URL member record URLs are derived from, if this owner
    /// has one.
    fn collection_url(&self) -> Option<String>;

    /// Put the record (back) into the holder. Used by the rollback path of
    /// an optimistic destroy.
    fn attach(&self, record: &Arc<Record>);

    /// Take the record out of the holder.
    fn detach(&self, record: &Arc<Record>);
}
