use serde_json::Value as JsonValue;

use super::block_on;
use crate::firestore::backup::{ExportOptions, ImportOptions, ImportSummary};
use crate::firestore::error::FirestoreResult;
use crate::firestore::model::StoreRef;
use crate::firestore::remote::datastore::DatastoreArc;

pub fn export_data(
    datastore: DatastoreArc,
    start: &StoreRef,
    options: ExportOptions,
) -> FirestoreResult<JsonValue> {
    block_on(crate::firestore::backup::export_data(datastore, start, options))
}

pub fn import_data(
    datastore: DatastoreArc,
    data: &JsonValue,
    target: &StoreRef,
    options: ImportOptions,
) -> FirestoreResult<ImportSummary> {
    block_on(crate::firestore::backup::import_data(
        datastore, data, target, options,
    ))
}
