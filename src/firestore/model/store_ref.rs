use std::fmt::{Display, Formatter};

use crate::firestore::error::FirestoreResult;
use crate::firestore::model::{CollectionKey, DocumentKey, ResourcePath};

/// Starting point of an export or target of an import.
///
/// The kind is decided by the path's segment parity, so a document's children are
/// always collections and a collection's children are always documents.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StoreRef {
    Database,
    Collection(CollectionKey),
    Document(DocumentKey),
}

impl StoreRef {
    pub fn from_path(path: &str) -> FirestoreResult<Self> {
        let path = ResourcePath::from_string(path)?;
        Ok(if path.is_empty() {
            StoreRef::Database
        } else if path.is_collection_path() {
            StoreRef::Collection(CollectionKey::from_trusted_path(path))
        } else {
            StoreRef::Document(DocumentKey::from_trusted_path(path))
        })
    }

    pub fn path(&self) -> ResourcePath {
        match self {
            StoreRef::Database => ResourcePath::root(),
            StoreRef::Collection(key) => key.path().clone(),
            StoreRef::Document(key) => key.path().clone(),
        }
    }
}

impl From<CollectionKey> for StoreRef {
    fn from(value: CollectionKey) -> Self {
        StoreRef::Collection(value)
    }
}

impl From<DocumentKey> for StoreRef {
    fn from(value: DocumentKey) -> Self {
        StoreRef::Document(value)
    }
}

impl Display for StoreRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreRef::Database => write!(f, "(database)"),
            StoreRef::Collection(key) => write!(f, "CollectionReference({key})"),
            StoreRef::Document(key) => write!(f, "DocumentReference({key})"),
        }
    }
}
