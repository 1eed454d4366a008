pub mod backup;
pub mod error;
pub mod model;
pub mod query;
mod query_evaluator;
pub mod remote;
pub mod snapshot;
pub mod value;

pub use backup::{
    export_data, import_data, ExportOptions, Exporter, ImportOptions, ImportSummary, Importer,
    RetrySettings,
};
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use model::{CollectionKey, DocumentKey, FieldPath, GeoPoint, StoreRef, Timestamp};
pub use query::{CollectionQuery, FieldFilter, FilterOperator};
pub use remote::datastore::{Datastore, DatastoreArc, InMemoryDatastore};
pub use snapshot::DocumentSnapshot;
pub use value::{FirestoreValue, MapValue};
