//! Tree export and import.
//!
//! An export walks every collection and document below a [`StoreRef`] and
//! produces a nested JSON tree:
//!
//! ```text
//! {
//!   "__collections__": {
//!     "users": {
//!       "u1": {
//!         "name": "Ann",
//!         "__collections__": { "orders": { "o1": { "total": 42, "__collections__": {} } } }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Documents that do not exist (but own sub-collections) or that were rejected
//! by the document filter carry [`MISSING_DOCUMENT_FLAG`] instead of fields.
//! Values that plain JSON cannot express are tagged by the [`codec`].

pub mod batch;
pub mod codec;
mod export;
mod import;
pub mod listing;
mod options;
pub mod retry;

use serde_json::Value as JsonValue;

use crate::firestore::error::FirestoreResult;
use crate::firestore::model::StoreRef;
use crate::firestore::remote::datastore::DatastoreArc;

pub use batch::{pending, run_batched, PendingOp};
pub use export::Exporter;
pub use import::{ImportSummary, Importer};
pub use listing::ListingMode;
pub use options::{
    DocumentFilter, ExportOptions, ImportOptions, ListingOptions, RetryObserver, RetrySettings,
    DEFAULT_BATCH_SIZE, DEFAULT_PAGE_SIZE, DEFAULT_RETRY_INTERVAL,
};
pub use retry::retry_on_deadline;

/// Key holding the sub-collections of a document (or of the database root).
pub const COLLECTIONS_KEY: &str = "__collections__";

/// Marks a document node whose fields were not exported.
pub const MISSING_DOCUMENT_FLAG: &str = "_import-export-flag-doesnotexists_";

/// Exports the subtree rooted at `start`.
pub async fn export_data(
    datastore: DatastoreArc,
    start: &StoreRef,
    options: ExportOptions,
) -> FirestoreResult<JsonValue> {
    Exporter::new(datastore, options).export(start).await
}

/// Imports `data` below `target`.
pub async fn import_data(
    datastore: DatastoreArc,
    data: &JsonValue,
    target: &StoreRef,
    options: ImportOptions,
) -> FirestoreResult<ImportSummary> {
    Importer::new(datastore, options).import(data, target).await
}
