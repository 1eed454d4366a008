use std::ops::AddAssign;

use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::firestore::backup::batch::{pending, run_batched, PendingOp};
use crate::firestore::backup::codec::decode_fields;
use crate::firestore::backup::options::ImportOptions;
use crate::firestore::backup::retry::retry_on_deadline;
use crate::firestore::backup::{COLLECTIONS_KEY, MISSING_DOCUMENT_FLAG};
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{CollectionKey, DocumentKey, StoreRef};
use crate::firestore::remote::datastore::DatastoreArc;
use crate::firestore::value::MapValue;

type Node = JsonMap<String, JsonValue>;

/// Counters reported by [`Importer::import`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub documents_written: usize,
    /// Documents carrying the existence flag; their sub-collections are still
    /// imported.
    pub documents_skipped: usize,
}

impl AddAssign for ImportSummary {
    fn add_assign(&mut self, other: Self) {
        self.documents_written += other.documents_written;
        self.documents_skipped += other.documents_skipped;
    }
}

/// Writes a portable tree (as produced by the exporter) back into a datastore.
#[derive(Clone)]
pub struct Importer {
    datastore: DatastoreArc,
    options: ImportOptions,
}

impl Importer {
    pub fn new(datastore: DatastoreArc, options: ImportOptions) -> Self {
        Self { datastore, options }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Imports `data` below `target`.
    ///
    /// The expected shape depends on the target: a database root takes
    /// `{"__collections__": {...}}`, a collection takes a map of document ids to
    /// document nodes, and a document takes a single document node.
    pub async fn import(
        &self,
        data: &JsonValue,
        target: &StoreRef,
    ) -> FirestoreResult<ImportSummary> {
        let node = as_node(data, &target.to_string())?;
        match target {
            StoreRef::Database => {
                if let Some(key) = node.keys().find(|key| key.as_str() != COLLECTIONS_KEY) {
                    return Err(invalid_argument(format!(
                        "Only '{COLLECTIONS_KEY}' may appear at the database root, found '{key}'"
                    )));
                }
                match node.get(COLLECTIONS_KEY) {
                    Some(collections) => {
                        let collections = as_node(collections, COLLECTIONS_KEY)?;
                        self.import_collections(None, collections).await
                    }
                    None => Ok(ImportSummary::default()),
                }
            }
            StoreRef::Collection(collection) => {
                self.import_collection(collection.clone(), node).await
            }
            StoreRef::Document(key) => self.import_document(key.clone(), node).await,
        }
    }

    fn import_document<'a>(
        &'a self,
        key: DocumentKey,
        node: &'a Node,
    ) -> BoxFuture<'a, FirestoreResult<ImportSummary>> {
        async move {
            let mut summary = ImportSummary::default();

            if is_flagged_missing(node) {
                log::debug!("skipping fields of missing document {key}");
                summary.documents_skipped += 1;
            } else {
                let fields: Node = node
                    .iter()
                    .filter(|(name, _)| {
                        name.as_str() != COLLECTIONS_KEY && name.as_str() != MISSING_DOCUMENT_FLAG
                    })
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect();
                let fields = decode_fields(&fields)?;
                self.write_document(&key, &fields).await?;
                summary.documents_written += 1;
            }

            if self.options.recursive {
                if let Some(collections) = node.get(COLLECTIONS_KEY) {
                    let collections = as_node(collections, COLLECTIONS_KEY)?;
                    summary += self.import_collections(Some(&key), collections).await?;
                }
            }
            Ok(summary)
        }
        .boxed()
    }

    async fn write_document(&self, key: &DocumentKey, fields: &MapValue) -> FirestoreResult<()> {
        let label = format!("write {key}");
        let merge = self.options.merge_with_existing;
        let datastore = self.datastore.as_ref();
        retry_on_deadline(&self.options.retry, &label, move || {
            datastore.set_document(key, fields.clone(), merge)
        })
        .await
    }

    fn import_collections<'a>(
        &'a self,
        parent: Option<&DocumentKey>,
        collections: &'a Node,
    ) -> BoxFuture<'a, FirestoreResult<ImportSummary>> {
        let targets = collections
            .iter()
            .map(|(id, node)| -> FirestoreResult<(CollectionKey, &'a Node)> {
                let collection = match parent {
                    Some(parent) => parent.collection(id)?,
                    None => root_collection(id)?,
                };
                Ok((collection, as_node(node, id)?))
            })
            .collect::<FirestoreResult<Vec<_>>>();

        async move {
            let ops = targets?
                .into_iter()
                .map(|(collection, node)| pending(move || self.import_collection(collection, node)))
                .collect();
            Ok(sum(run_batched(ops, self.options.batch_size).await?))
        }
        .boxed()
    }

    fn import_collection<'a>(
        &'a self,
        collection: CollectionKey,
        documents: &'a Node,
    ) -> BoxFuture<'a, FirestoreResult<ImportSummary>> {
        async move {
            if self.options.logs {
                log::info!("Writing documents to {collection}");
            }
            let ops = documents
                .iter()
                .map(|(id, node)| -> FirestoreResult<PendingOp<'a, ImportSummary>> {
                    let key = collection.doc(id)?;
                    let node = as_node(node, id)?;
                    Ok(pending(move || self.import_document(key, node)))
                })
                .collect::<FirestoreResult<Vec<_>>>()?;
            Ok(sum(run_batched(ops, self.options.batch_size).await?))
        }
        .boxed()
    }
}

fn sum(parts: Vec<ImportSummary>) -> ImportSummary {
    parts.into_iter().fold(ImportSummary::default(), |mut total, part| {
        total += part;
        total
    })
}

fn as_node<'a>(value: &'a JsonValue, context: &str) -> FirestoreResult<&'a Node> {
    value
        .as_object()
        .ok_or_else(|| invalid_argument(format!("Expected a JSON object at '{context}'")))
}

fn is_flagged_missing(node: &Node) -> bool {
    matches!(node.get(MISSING_DOCUMENT_FLAG), Some(JsonValue::Bool(true)))
}

fn root_collection(id: &str) -> FirestoreResult<CollectionKey> {
    if id.is_empty() || id.contains('/') {
        return Err(invalid_argument(format!("Invalid collection id '{id}'")));
    }
    CollectionKey::from_string(id)
}
