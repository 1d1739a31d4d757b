//! Shared handle to a dealer book
//!
//! One ingest path writes, any number of readers take views. Readers hold
//! the lock only long enough to clone an `Arc`, so a view never observes a
//! half-applied update.

use std::sync::Arc;

use parking_lot::RwLock;

use super::{BookView, DealerBook};

#[derive(Debug, Clone)]
pub struct SharedDealerBook {
    inner: Arc<RwLock<DealerBook>>,
}

impl SharedDealerBook {
    pub fn new(book: DealerBook) -> Self {
        Self {
            inner: Arc::new(RwLock::new(book)),
        }
    }

    /// Point-in-time view; never blocks on readers, only on an in-flight write
    pub fn snapshot_view(&self) -> BookView {
        self.inner.read().snapshot_view()
    }

    /// Run a mutation under the write lock
    pub fn write<R>(&self, f: impl FnOnce(&mut DealerBook) -> R) -> R {
        let mut book = self.inner.write();
        f(&mut book)
    }

    /// Run a read-only closure under the read lock
    pub fn read<R>(&self, f: impl FnOnce(&DealerBook) -> R) -> R {
        let book = self.inner.read();
        f(&book)
    }
}
