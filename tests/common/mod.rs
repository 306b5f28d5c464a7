#![allow(dead_code)]

use std::sync::Arc;

use streamrec::store::MemoryStore;

pub use streamrec_test_utils::{init_tracing, with_timeout};

/// Fresh in-memory store for a test.
pub fn store() -> Arc<MemoryStore> {
    init_tracing();
    Arc::new(MemoryStore::new())
}
