use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use firestore_porter::firestore::backup::{
    export_data, import_data, ExportOptions, ImportOptions, RetrySettings,
};
use firestore_porter::firestore::error::deadline_exceeded;
use firestore_porter::firestore::remote::datastore::{DatastoreOperation, InMemoryDatastore};
use firestore_porter::firestore::StoreRef;
use serde_json::{json, Value as JsonValue};

fn sample_tree() -> JsonValue {
    json!({
        "__collections__": {
            "users": {
                "u1": {
                    "name": "Ann",
                    "age": 31,
                    "score": 1.5,
                    "ratio": {"__datatype__": "double", "value": "NaN"},
                    "nothing": null,
                    "tags": ["a", 2, {"nested": true}],
                    "joined": {"__datatype__": "timestamp", "value": "2024-05-01T12:00:00.000000001Z"},
                    "home": {"__datatype__": "geopoint", "value": {"latitude": 48.85, "longitude": 2.35}},
                    "avatar": {"__datatype__": "bytes", "value": "3q2+7w=="},
                    "best_friend": {"__datatype__": "documentReferenceField", "value": "users/u2"},
                    "address": {"city": "Paris", "zip": "75001"},
                    "__collections__": {
                        "orders": {
                            "o1": {"total": 42, "__collections__": {}},
                            "o2": {"total": 7, "__collections__": {}}
                        }
                    }
                },
                "u2": {"name": "Bob", "__collections__": {}},
                "ghost": {
                    "_import-export-flag-doesnotexists_": true,
                    "__collections__": {
                        "orders": {"o9": {"total": 1, "__collections__": {}}}
                    }
                }
            },
            "settings": {
                "global": {"theme": "dark", "__collections__": {}}
            }
        }
    })
}

#[tokio::test]
async fn export_of_import_is_identity() {
    let datastore = Arc::new(InMemoryDatastore::new());
    let tree = sample_tree();

    let summary = import_data(
        datastore.clone(),
        &tree,
        &StoreRef::Database,
        ImportOptions::new(),
    )
    .await
    .unwrap();
    assert_eq!(summary.documents_written, 6);
    assert_eq!(summary.documents_skipped, 1);

    let exported = export_data(datastore, &StoreRef::Database, ExportOptions::new())
        .await
        .unwrap();
    assert_eq!(exported, tree);
}

#[tokio::test]
async fn exported_text_reimports_into_another_store() {
    let source = Arc::new(InMemoryDatastore::new());
    import_data(source.clone(), &sample_tree(), &StoreRef::Database, ImportOptions::new())
        .await
        .unwrap();
    let text = serde_json::to_string_pretty(
        &export_data(source, &StoreRef::Database, ExportOptions::new())
            .await
            .unwrap(),
    )
    .unwrap();

    let target = Arc::new(InMemoryDatastore::new());
    let parsed: JsonValue = serde_json::from_str(&text).unwrap();
    import_data(target.clone(), &parsed, &StoreRef::Database, ImportOptions::new())
        .await
        .unwrap();
    let copied = export_data(target, &StoreRef::Database, ExportOptions::new())
        .await
        .unwrap();
    assert_eq!(copied, sample_tree());
}

#[tokio::test]
async fn subtree_moves_to_a_new_parent() {
    let datastore = Arc::new(InMemoryDatastore::new());
    import_data(datastore.clone(), &sample_tree(), &StoreRef::Database, ImportOptions::new())
        .await
        .unwrap();

    let orders = export_data(
        datastore.clone(),
        &StoreRef::from_path("users/u1/orders").unwrap(),
        ExportOptions::new(),
    )
    .await
    .unwrap();
    import_data(
        datastore.clone(),
        &orders,
        &StoreRef::from_path("archive/2024/orders").unwrap(),
        ImportOptions::new(),
    )
    .await
    .unwrap();

    let archived = export_data(
        datastore,
        &StoreRef::from_path("archive/2024/orders").unwrap(),
        ExportOptions::new(),
    )
    .await
    .unwrap();
    assert_eq!(archived, orders);
}

#[tokio::test(start_paused = true)]
async fn deadline_failures_are_retried_end_to_end() {
    let datastore = Arc::new(InMemoryDatastore::new());
    datastore.fail_next(DatastoreOperation::SetDocument, deadline_exceeded("slow write"));
    import_data(datastore.clone(), &sample_tree(), &StoreRef::Database, ImportOptions::new())
        .await
        .unwrap();

    datastore.fail_next(DatastoreOperation::ListCollections, deadline_exceeded("slow list"));
    datastore.fail_next(DatastoreOperation::GetDocument, deadline_exceeded("slow read"));
    let retries = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&retries);
    let options = ExportOptions::new().with_retry_settings(
        RetrySettings::default().with_observer(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    let exported = export_data(datastore, &StoreRef::Database, options)
        .await
        .unwrap();
    assert_eq!(exported, sample_tree());
    assert_eq!(retries.load(Ordering::SeqCst), 2);
}
