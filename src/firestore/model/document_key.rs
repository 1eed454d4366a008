use std::fmt::{Display, Formatter};

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{CollectionKey, ResourcePath};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    path: ResourcePath,
}

impl DocumentKey {
    pub fn from_path(path: ResourcePath) -> FirestoreResult<Self> {
        if !path.is_document_path() {
            return Err(invalid_argument(format!(
                "Document keys must point to a document (even number of segments), got '{path}'"
            )));
        }
        Ok(Self { path })
    }

    pub fn from_string(path: &str) -> FirestoreResult<Self> {
        let resource = ResourcePath::from_string(path)?;
        Self::from_path(resource)
    }

    /// The collection that directly contains this document.
    pub fn parent(&self) -> CollectionKey {
        CollectionKey::from_trusted_path(self.path.without_last())
    }

    /// Returns the sub-collection `collection_id` nested under this document.
    pub fn collection(&self, collection_id: &str) -> FirestoreResult<CollectionKey> {
        if collection_id.is_empty() || collection_id.contains('/') {
            return Err(invalid_argument(format!(
                "Invalid collection id '{collection_id}'"
            )));
        }
        Ok(CollectionKey::from_trusted_path(
            self.path.child([collection_id]),
        ))
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }

    pub(crate) fn from_trusted_path(path: ResourcePath) -> Self {
        debug_assert!(path.is_document_path());
        Self { path }
    }
}

impl Display for DocumentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}
