pub mod datastore;

pub use datastore::{Datastore, DatastoreArc, DatastoreOperation, InMemoryDatastore};
