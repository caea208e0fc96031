//! Page store: fixed-capacity pages keyed by their big-endian index.

use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{DidError, DidResult, ErrorCode};
use crate::models::{page_key, Page, PAGE_KEY_SIZE};

use super::BoxUsage;

/// Trait for page storage operations.
pub trait PageStore: Send + Sync {
    /// Returns a copy of the page at `index`.
    fn get(&self, index: u64) -> Option<Page>;

    /// Returns the page contents at `index`.
    fn read(&self, index: u64) -> Option<Bytes>;

    /// Stores `page` at `index`, replacing any previous page.
    fn put(&self, index: u64, page: Page);

    /// Removes the page at `index`.
    fn remove(&self, index: u64) -> DidResult<()>;

    /// Capacity of the page at `index`, if it exists.
    fn capacity(&self, index: u64) -> Option<u64>;

    /// Boxes and bytes (keys plus values) held by the store.
    fn usage(&self) -> BoxUsage;
}

/// In-memory page store.
pub struct MemoryPageStore {
    pages: DashMap<[u8; PAGE_KEY_SIZE], Page>,
    /// Sum of page capacities.
    stored_bytes: AtomicU64,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self {
            pages: DashMap::new(),
            stored_bytes: AtomicU64::new(0),
        }
    }
}

impl Default for MemoryPageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PageStore for MemoryPageStore {
    fn get(&self, index: u64) -> Option<Page> {
        self.pages.get(&page_key(index)).map(|p| p.value().clone())
    }

    fn read(&self, index: u64) -> Option<Bytes> {
        self.pages.get(&page_key(index)).map(|p| p.value().to_bytes())
    }

    fn put(&self, index: u64, page: Page) {
        let capacity = page.capacity();
        if let Some(previous) = self.pages.insert(page_key(index), page) {
            self.stored_bytes
                .fetch_sub(previous.capacity(), Ordering::Relaxed);
        }
        self.stored_bytes.fetch_add(capacity, Ordering::Relaxed);
    }

    fn remove(&self, index: u64) -> DidResult<()> {
        let (_, page) = self.pages.remove(&page_key(index)).ok_or_else(|| {
            DidError::with_message(ErrorCode::PageNotFound, format!("page {} does not exist", index))
        })?;
        self.stored_bytes.fetch_sub(page.capacity(), Ordering::Relaxed);
        Ok(())
    }

    fn capacity(&self, index: u64) -> Option<u64> {
        self.pages.get(&page_key(index)).map(|p| p.capacity())
    }

    fn usage(&self) -> BoxUsage {
        let (boxes, key_bytes) = self
            .pages
            .iter()
            .fold((0u64, 0u64), |(n, k), e| (n + 1, k + e.key().len() as u64));
        BoxUsage {
            boxes,
            bytes: key_bytes + self.stored_bytes.load(Ordering::Relaxed),
        }
    }
}
