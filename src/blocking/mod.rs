//! Synchronous wrappers for callers without an async runtime.
//!
//! The wrappers drive the async API on a shared current-thread Tokio runtime.
//! They must not be called from inside another Tokio runtime.

pub mod backup;

use once_cell::sync::Lazy;
use tokio::runtime::Runtime;

static RT: Lazy<Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("Tokio runtime")
});

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    RT.block_on(fut)
}
