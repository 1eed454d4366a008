//! Export and import Cloud Firestore document trees as portable JSON.
//!
//! The async entry points live in [`firestore::backup`]; [`blocking`] wraps
//! them for synchronous callers. Any backend implementing
//! [`firestore::Datastore`] can be exported from or imported into, including
//! the bundled [`firestore::InMemoryDatastore`].

pub mod blocking;
pub mod firestore;
pub mod platform;
