use std::sync::Arc;

use async_trait::async_trait;

use crate::firestore::error::FirestoreResult;
use crate::firestore::model::{CollectionKey, DocumentKey};
use crate::firestore::query::CollectionQuery;
use crate::firestore::snapshot::DocumentSnapshot;
use crate::firestore::value::MapValue;

pub mod in_memory;

/// The remote operations the exporter and importer need from a document store.
///
/// Implementations report transient server timeouts as
/// [`FirestoreErrorCode::DeadlineExceeded`](crate::firestore::FirestoreErrorCode::DeadlineExceeded);
/// callers retry those and treat every other error as fatal.
#[async_trait]
pub trait Datastore: Send + Sync + 'static {
    /// Lists the immediate child collections of `parent`, or of the database root
    /// when `parent` is `None`.
    async fn list_collections(
        &self,
        parent: Option<&DocumentKey>,
    ) -> FirestoreResult<Vec<CollectionKey>>;

    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot>;

    /// Lists every document of `collection`, including documents that have no
    /// fields of their own but still own sub-collections.
    async fn list_documents(&self, collection: &CollectionKey)
        -> FirestoreResult<Vec<DocumentKey>>;

    /// Runs one filtered page request. Only existing documents are returned.
    async fn run_query(&self, query: &CollectionQuery) -> FirestoreResult<Vec<DocumentSnapshot>>;

    /// Writes `data` to `key`. With `merge` the fields are overlaid onto the
    /// existing document instead of replacing it.
    async fn set_document(&self, key: &DocumentKey, data: MapValue, merge: bool)
        -> FirestoreResult<()>;
}

pub type DatastoreArc = Arc<dyn Datastore>;

pub use in_memory::{DatastoreOperation, InMemoryDatastore};
