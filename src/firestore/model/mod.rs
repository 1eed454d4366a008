mod collection_key;
mod document_key;
mod field_path;
mod geo_point;
mod resource_path;
mod store_ref;
mod timestamp;

pub use collection_key::CollectionKey;
pub use document_key::DocumentKey;
pub use field_path::{FieldPath, IntoFieldPath};
pub use geo_point::GeoPoint;
pub use resource_path::ResourcePath;
pub use store_ref::StoreRef;
pub use timestamp::Timestamp;
