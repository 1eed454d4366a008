use std::fmt::{Display, Formatter};

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{DocumentKey, ResourcePath};

/// Path to a collection: always an odd number of segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CollectionKey {
    path: ResourcePath,
}

impl CollectionKey {
    pub fn from_path(path: ResourcePath) -> FirestoreResult<Self> {
        if !path.is_collection_path() {
            return Err(invalid_argument(format!(
                "Collection keys must point to a collection (odd number of segments), got '{path}'"
            )));
        }
        Ok(Self { path })
    }

    pub fn from_string(path: &str) -> FirestoreResult<Self> {
        Self::from_path(ResourcePath::from_string(path)?)
    }

    /// The collection id (last path segment).
    pub fn id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// The owning document, or `None` for a root-level collection.
    pub fn parent(&self) -> Option<DocumentKey> {
        let parent = self.path.without_last();
        if parent.is_empty() {
            None
        } else {
            Some(DocumentKey::from_trusted_path(parent))
        }
    }

    /// Returns the document `document_id` inside this collection.
    pub fn doc(&self, document_id: &str) -> FirestoreResult<DocumentKey> {
        if document_id.is_empty() || document_id.contains('/') {
            return Err(invalid_argument(format!(
                "Invalid document id '{document_id}'"
            )));
        }
        Ok(DocumentKey::from_trusted_path(self.path.child([document_id])))
    }

    pub(crate) fn from_trusted_path(path: ResourcePath) -> Self {
        debug_assert!(path.is_collection_path());
        Self { path }
    }
}

impl Display for CollectionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}
