use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::firestore::backup::batch::{pending, run_batched, PendingOp};
use crate::firestore::backup::codec::encode_fields;
use crate::firestore::backup::listing::list_documents;
use crate::firestore::backup::options::ExportOptions;
use crate::firestore::backup::retry::retry_on_deadline;
use crate::firestore::backup::{COLLECTIONS_KEY, MISSING_DOCUMENT_FLAG};
use crate::firestore::error::{unsupported_type, FirestoreResult};
use crate::firestore::model::{CollectionKey, DocumentKey, StoreRef};
use crate::firestore::remote::datastore::DatastoreArc;

type Node = JsonMap<String, JsonValue>;

/// Walks the document tree below a [`StoreRef`] and produces its portable form.
///
/// Every fan-out point (sibling collections, sibling documents, and a
/// document's own fields next to its sub-collections) is bounded by
/// `ExportOptions::batch_size`. Nested fan-outs apply their bound
/// independently.
#[derive(Clone)]
pub struct Exporter {
    datastore: DatastoreArc,
    options: ExportOptions,
}

impl Exporter {
    pub fn new(datastore: DatastoreArc, options: ExportOptions) -> Self {
        Self { datastore, options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Exports the subtree rooted at `start`.
    ///
    /// * database root: `{"__collections__": {...}}`
    /// * collection: `{<doc id>: <document node>, ...}`
    /// * document: its fields plus `__collections__`, or the existence flag when
    ///   the document is missing or rejected by the document filter.
    pub async fn export(&self, start: &StoreRef) -> FirestoreResult<JsonValue> {
        let node = match start {
            StoreRef::Database => {
                let collections = self.export_collections(None).await?;
                let mut root = Node::new();
                root.insert(COLLECTIONS_KEY.to_string(), JsonValue::Object(collections));
                root
            }
            StoreRef::Collection(collection) => self.export_collection(collection.clone()).await?,
            StoreRef::Document(key) => self.export_document(key.clone()).await?,
        };
        Ok(JsonValue::Object(node))
    }

    fn export_document(&self, key: DocumentKey) -> BoxFuture<'_, FirestoreResult<Node>> {
        async move {
            let fields_key = key.clone();
            let ops: Vec<PendingOp<'_, Node>> = vec![
                pending(move || self.document_fields(fields_key)),
                pending(move || self.export_collections(Some(key))),
            ];
            let mut parts = run_batched(ops, 2).await?.into_iter();
            let mut node = parts.next().unwrap_or_default();
            let collections = parts.next().unwrap_or_default();
            node.insert(COLLECTIONS_KEY.to_string(), JsonValue::Object(collections));
            Ok(node)
        }
        .boxed()
    }

    async fn document_fields(&self, key: DocumentKey) -> FirestoreResult<Node> {
        let label = format!("read {key}");
        let key_ref = &key;
        let datastore = self.datastore.as_ref();
        let snapshot =
            retry_on_deadline(&self.options.retry, &label, move || datastore.get_document(key_ref))
                .await?;

        match snapshot.map_value() {
            Some(fields) if self.options.accepts(&snapshot) => {
                if let Some(reserved) = [COLLECTIONS_KEY, MISSING_DOCUMENT_FLAG]
                    .into_iter()
                    .find(|name| fields.fields().contains_key(*name))
                {
                    return Err(unsupported_type(format!(
                        "Field '{reserved}' of {key} clashes with a reserved export key"
                    )));
                }
                encode_fields(fields)
            }
            _ => {
                let mut node = Node::new();
                node.insert(MISSING_DOCUMENT_FLAG.to_string(), JsonValue::Bool(true));
                Ok(node)
            }
        }
    }

    fn export_collections(
        &self,
        parent: Option<DocumentKey>,
    ) -> BoxFuture<'_, FirestoreResult<Node>> {
        async move {
            let label = match &parent {
                Some(key) => format!("list collections of {key}"),
                None => "list root collections".to_string(),
            };
            let parent_ref = parent.as_ref();
            let datastore = self.datastore.as_ref();
            let collections = retry_on_deadline(&self.options.retry, &label, move || {
                datastore.list_collections(parent_ref)
            })
            .await?;

            let ops = collections
                .iter()
                .cloned()
                .map(|collection| pending(move || self.export_collection(collection)))
                .collect();
            let nodes = run_batched(ops, self.options.batch_size).await?;

            Ok(collections
                .iter()
                .zip(nodes)
                .map(|(collection, node)| (collection.id().to_string(), JsonValue::Object(node)))
                .collect())
        }
        .boxed()
    }

    fn export_collection(&self, collection: CollectionKey) -> BoxFuture<'_, FirestoreResult<Node>> {
        async move {
            if self.options.logs {
                log::info!("Retrieving documents from {collection}");
            }
            let keys = list_documents(
                self.datastore.as_ref(),
                &collection,
                &self.options.listing,
                &self.options.retry,
            )
            .await?;

            let ops = keys
                .iter()
                .cloned()
                .map(|key| pending(move || self.export_document(key)))
                .collect();
            let nodes = run_batched(ops, self.options.batch_size).await?;

            Ok(keys
                .iter()
                .zip(nodes)
                .map(|(key, node)| (key.id().to_string(), JsonValue::Object(node)))
                .collect())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::error::{deadline_exceeded, unavailable};
    use crate::firestore::query::{FieldFilter, FilterOperator};
    use crate::firestore::remote::datastore::{Datastore, DatastoreOperation, InMemoryDatastore};
    use crate::firestore::value::{FirestoreValue, MapValue};
    use serde_json::json;
    use std::sync::Arc;

    async fn put(datastore: &InMemoryDatastore, path: &str, fields: &[(&str, FirestoreValue)]) {
        let map: MapValue = fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        datastore
            .set_document(&DocumentKey::from_string(path).unwrap(), map, false)
            .await
            .unwrap();
    }

    async fn users_with_orders() -> InMemoryDatastore {
        let datastore = InMemoryDatastore::new();
        put(&datastore, "users/u1", &[("name", "Ann".into())]).await;
        put(&datastore, "users/u1/orders/o1", &[("total", 42i64.into())]).await;
        datastore
    }

    fn exporter(datastore: &InMemoryDatastore, options: ExportOptions) -> Exporter {
        Exporter::new(Arc::new(datastore.clone()), options)
    }

    #[tokio::test]
    async fn exports_from_root() {
        let datastore = users_with_orders().await;
        let tree = exporter(&datastore, ExportOptions::new())
            .export(&StoreRef::Database)
            .await
            .unwrap();
        assert_eq!(
            tree,
            json!({
                "__collections__": {
                    "users": {
                        "u1": {
                            "name": "Ann",
                            "__collections__": {
                                "orders": {
                                    "o1": {"total": 42, "__collections__": {}}
                                }
                            }
                        }
                    }
                }
            })
        );
    }

    #[tokio::test]
    async fn exports_collection_and_document_starting_points() {
        let datastore = users_with_orders().await;
        let exporter = exporter(&datastore, ExportOptions::new());

        let orders = exporter
            .export(&StoreRef::from_path("users/u1/orders").unwrap())
            .await
            .unwrap();
        assert_eq!(orders, json!({"o1": {"total": 42, "__collections__": {}}}));

        let order = exporter
            .export(&StoreRef::from_path("users/u1/orders/o1").unwrap())
            .await
            .unwrap();
        assert_eq!(order, json!({"total": 42, "__collections__": {}}));
    }

    #[tokio::test]
    async fn missing_documents_carry_only_the_flag() {
        let datastore = InMemoryDatastore::new();
        put(&datastore, "users/ghost/orders/o1", &[("total", 1i64.into())]).await;
        let exporter = exporter(&datastore, ExportOptions::new());

        let tree = exporter
            .export(&StoreRef::from_path("users").unwrap())
            .await
            .unwrap();
        assert_eq!(
            tree,
            json!({
                "ghost": {
                    "_import-export-flag-doesnotexists_": true,
                    "__collections__": {"orders": {"o1": {"total": 1, "__collections__": {}}}}
                }
            })
        );

        let nowhere = exporter
            .export(&StoreRef::from_path("users/nobody").unwrap())
            .await
            .unwrap();
        assert_eq!(
            nowhere,
            json!({"_import-export-flag-doesnotexists_": true, "__collections__": {}})
        );
    }

    #[tokio::test]
    async fn rejected_documents_are_flagged() {
        let datastore = users_with_orders().await;
        put(&datastore, "users/u2", &[("name", "Bob".into())]).await;
        let options = ExportOptions::new().with_doc_filter(|snapshot| {
            snapshot.get("name") != Some(&FirestoreValue::from_string("Bob"))
        });

        let tree = exporter(&datastore, options)
            .export(&StoreRef::from_path("users").unwrap())
            .await
            .unwrap();
        assert_eq!(
            tree["u2"],
            json!({"_import-export-flag-doesnotexists_": true, "__collections__": {}})
        );
        assert_eq!(tree["u1"]["name"], json!("Ann"));
    }

    #[tokio::test]
    async fn filtered_listing_applies_only_to_matching_paths() {
        let datastore = users_with_orders().await;
        put(&datastore, "users/u1/orders/o2", &[("total", 5i64.into())]).await;
        let options = ExportOptions::new()
            .with_where_clauses(vec![FieldFilter::new(
                "total",
                FilterOperator::GreaterThan,
                10i64,
            )
            .unwrap()])
            .with_where_paths(["orders"]);

        let tree = exporter(&datastore, options)
            .export(&StoreRef::Database)
            .await
            .unwrap();
        let orders = &tree["__collections__"]["users"]["u1"]["__collections__"]["orders"];
        assert_eq!(orders, &json!({"o1": {"total": 42, "__collections__": {}}}));
        assert_eq!(datastore.call_count(DatastoreOperation::RunQuery), 1);
    }

    #[tokio::test]
    async fn reserved_field_names_abort_the_export() {
        for reserved in [COLLECTIONS_KEY, MISSING_DOCUMENT_FLAG] {
            let datastore = InMemoryDatastore::new();
            put(&datastore, "users/u1", &[(reserved, 7i64.into())]).await;

            let err = exporter(&datastore, ExportOptions::new())
                .export(&StoreRef::from_path("users/u1").unwrap())
                .await
                .unwrap_err();
            assert_eq!(err.code_str(), "firestore/unsupported-type");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_timeouts_are_invisible() {
        let datastore = users_with_orders().await;
        datastore.fail_next(DatastoreOperation::ListCollections, deadline_exceeded("slow"));
        datastore.fail_next(DatastoreOperation::GetDocument, deadline_exceeded("slow"));
        datastore.fail_next(DatastoreOperation::ListDocuments, deadline_exceeded("slow"));

        let tree = exporter(&datastore, ExportOptions::new())
            .export(&StoreRef::Database)
            .await
            .unwrap();
        assert_eq!(tree["__collections__"]["users"]["u1"]["name"], json!("Ann"));
    }

    #[tokio::test]
    async fn remote_failures_abort_the_export() {
        let datastore = users_with_orders().await;
        datastore.fail_next(DatastoreOperation::GetDocument, unavailable("backend down"));

        let err = exporter(&datastore, ExportOptions::new())
            .export(&StoreRef::Database)
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore/unavailable");
    }

    #[tokio::test]
    async fn unsupported_values_abort_the_export() {
        // A datastore that hands back a write-only sentinel as stored data.
        struct SentinelStore(InMemoryDatastore);

        #[async_trait::async_trait]
        impl Datastore for SentinelStore {
            async fn list_collections(
                &self,
                parent: Option<&DocumentKey>,
            ) -> FirestoreResult<Vec<CollectionKey>> {
                self.0.list_collections(parent).await
            }

            async fn get_document(
                &self,
                key: &DocumentKey,
            ) -> FirestoreResult<crate::firestore::snapshot::DocumentSnapshot> {
                let fields: MapValue =
                    [("at".to_string(), FirestoreValue::server_timestamp())].into_iter().collect();
                Ok(crate::firestore::snapshot::DocumentSnapshot::new(
                    key.clone(),
                    Some(fields),
                ))
            }

            async fn list_documents(
                &self,
                collection: &CollectionKey,
            ) -> FirestoreResult<Vec<DocumentKey>> {
                self.0.list_documents(collection).await
            }

            async fn run_query(
                &self,
                query: &crate::firestore::query::CollectionQuery,
            ) -> FirestoreResult<Vec<crate::firestore::snapshot::DocumentSnapshot>> {
                self.0.run_query(query).await
            }

            async fn set_document(
                &self,
                key: &DocumentKey,
                data: MapValue,
                merge: bool,
            ) -> FirestoreResult<()> {
                self.0.set_document(key, data, merge).await
            }
        }

        let inner = users_with_orders().await;
        let exporter = Exporter::new(Arc::new(SentinelStore(inner)), ExportOptions::new());
        let err = exporter.export(&StoreRef::Database).await.unwrap_err();
        assert_eq!(err.code_str(), "firestore/unsupported-type");
    }
}
