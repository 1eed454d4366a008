use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::firestore::error::{internal_error, FirestoreError, FirestoreResult};
use crate::firestore::model::{CollectionKey, DocumentKey, ResourcePath, Timestamp};
use crate::firestore::query::CollectionQuery;
use crate::firestore::query_evaluator::apply_query_to_documents;
use crate::firestore::snapshot::DocumentSnapshot;
use crate::firestore::value::{FirestoreValue, MapValue, SentinelValue, ValueKind};

use super::Datastore;

/// Identifies one [`Datastore`] method, for fault injection and call accounting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DatastoreOperation {
    ListCollections,
    GetDocument,
    ListDocuments,
    RunQuery,
    SetDocument,
}

#[derive(Default)]
struct State {
    documents: BTreeMap<String, MapValue>,
    faults: HashMap<DatastoreOperation, VecDeque<FirestoreError>>,
    calls: HashMap<DatastoreOperation, usize>,
}

/// Process-local [`Datastore`] keeping documents in a shared ordered map.
///
/// Clones share the same underlying state.
#[derive(Clone, Default)]
pub struct InMemoryDatastore {
    state: Arc<Mutex<State>>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call to `operation` fail with `error`. Queued faults are
    /// consumed in order, one per call.
    pub fn fail_next(&self, operation: DatastoreOperation, error: FirestoreError) {
        if let Ok(mut state) = self.state.lock() {
            state.faults.entry(operation).or_default().push_back(error);
        }
    }

    /// Number of times `operation` has been invoked, failed calls included.
    pub fn call_count(&self, operation: DatastoreOperation) -> usize {
        self.state
            .lock()
            .map(|state| state.calls.get(&operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.documents.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn begin(&self, operation: DatastoreOperation) -> FirestoreResult<MutexGuard<'_, State>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| internal_error("In-memory datastore lock poisoned"))?;
        *state.calls.entry(operation).or_default() += 1;
        if let Some(error) = state
            .faults
            .get_mut(&operation)
            .and_then(|queue| queue.pop_front())
        {
            return Err(error);
        }
        Ok(state)
    }
}

/// Collects the distinct path segment found at `depth` in every stored document
/// path lying below `parent`.
fn child_ids(state: &State, parent: &ResourcePath) -> FirestoreResult<BTreeSet<String>> {
    let mut ids = BTreeSet::new();
    for path in state.documents.keys() {
        let path = ResourcePath::from_string(path)?;
        if parent.is_proper_prefix_of(&path) {
            if let Some(id) = path.get(parent.len()) {
                ids.insert(id.to_string());
            }
        }
    }
    Ok(ids)
}

fn resolve_sentinels(value: FirestoreValue, write_time: Timestamp) -> FirestoreValue {
    match value.kind() {
        ValueKind::Sentinel(SentinelValue::ServerTimestamp) => {
            FirestoreValue::from_timestamp(write_time)
        }
        ValueKind::Map(map) => FirestoreValue::from_map(
            map.fields()
                .iter()
                .map(|(name, value)| (name.clone(), resolve_sentinels(value.clone(), write_time)))
                .collect(),
        ),
        ValueKind::Array(array) => FirestoreValue::from_array(
            array
                .values()
                .iter()
                .map(|value| resolve_sentinels(value.clone(), write_time))
                .collect(),
        ),
        _ => value,
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn list_collections(
        &self,
        parent: Option<&DocumentKey>,
    ) -> FirestoreResult<Vec<CollectionKey>> {
        let state = self.begin(DatastoreOperation::ListCollections)?;
        let parent_path = parent
            .map(|key| key.path().clone())
            .unwrap_or_else(ResourcePath::root);
        child_ids(&state, &parent_path)?
            .into_iter()
            .map(|id| CollectionKey::from_path(parent_path.child([id])))
            .collect()
    }

    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        let state = self.begin(DatastoreOperation::GetDocument)?;
        let data = state.documents.get(&key.path().canonical_string()).cloned();
        Ok(DocumentSnapshot::new(key.clone(), data))
    }

    async fn list_documents(
        &self,
        collection: &CollectionKey,
    ) -> FirestoreResult<Vec<DocumentKey>> {
        let state = self.begin(DatastoreOperation::ListDocuments)?;
        child_ids(&state, collection.path())?
            .into_iter()
            .map(|id| collection.doc(&id))
            .collect()
    }

    async fn run_query(&self, query: &CollectionQuery) -> FirestoreResult<Vec<DocumentSnapshot>> {
        let state = self.begin(DatastoreOperation::RunQuery)?;
        let mut candidates = Vec::new();
        for (path, data) in state.documents.iter() {
            let path = ResourcePath::from_string(path)?;
            if query.collection().path().is_proper_prefix_of(&path)
                && path.len() == query.collection().path().len() + 1
            {
                candidates.push(DocumentSnapshot::new(
                    DocumentKey::from_path(path)?,
                    Some(data.clone()),
                ));
            }
        }
        Ok(apply_query_to_documents(candidates, query))
    }

    async fn set_document(
        &self,
        key: &DocumentKey,
        data: MapValue,
        merge: bool,
    ) -> FirestoreResult<()> {
        let mut state = self.begin(DatastoreOperation::SetDocument)?;
        let write_time = Timestamp::now();
        let resolved: BTreeMap<String, FirestoreValue> = data
            .into_fields()
            .into_iter()
            .map(|(name, value)| (name, resolve_sentinels(value, write_time)))
            .collect();

        let canonical = key.path().canonical_string();
        let fields = if merge {
            let mut fields = state
                .documents
                .get(&canonical)
                .map(|existing| existing.fields().clone())
                .unwrap_or_default();
            fields.extend(resolved);
            fields
        } else {
            resolved
        };
        state.documents.insert(canonical, MapValue::new(fields));
        Ok(())
    }
}
