//! Metadata registry: one encoded record per owner key.

use dashmap::DashMap;

use crate::error::{DidError, DidResult, ErrorCode};
use crate::models::{Metadata, OwnerKey, KEY_LENGTH, METADATA_SIZE};

use super::BoxUsage;

/// Trait for metadata registry operations.
pub trait MetadataRegistry: Send + Sync {
    /// Returns the record for `owner`, if one exists.
    fn get(&self, owner: &OwnerKey) -> DidResult<Option<Metadata>>;

    /// Returns the encoded record for `owner`.
    fn get_raw(&self, owner: &OwnerKey) -> Option<[u8; METADATA_SIZE]>;

    /// Stores the record for `owner`, replacing any previous record.
    fn put(&self, owner: OwnerKey, metadata: Metadata);

    /// Removes the record for `owner`.
    fn remove(&self, owner: &OwnerKey) -> DidResult<()>;

    fn contains(&self, owner: &OwnerKey) -> bool;

    /// All owners with a record, sorted.
    fn owners(&self) -> Vec<OwnerKey>;

    /// Boxes and bytes (keys plus values) held by the registry.
    fn usage(&self) -> BoxUsage;
}

/// In-memory registry storing records in their fixed-width encoding.
pub struct MemoryMetadataRegistry {
    records: DashMap<OwnerKey, [u8; METADATA_SIZE]>,
}

impl MemoryMetadataRegistry {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }
}

impl Default for MemoryMetadataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataRegistry for MemoryMetadataRegistry {
    fn get(&self, owner: &OwnerKey) -> DidResult<Option<Metadata>> {
        self.get_raw(owner)
            .map(|raw| Metadata::decode(&raw))
            .transpose()
    }

    fn get_raw(&self, owner: &OwnerKey) -> Option<[u8; METADATA_SIZE]> {
        self.records.get(owner).map(|r| *r.value())
    }

    fn put(&self, owner: OwnerKey, metadata: Metadata) {
        self.records.insert(owner, metadata.encode());
    }

    fn remove(&self, owner: &OwnerKey) -> DidResult<()> {
        self.records
            .remove(owner)
            .map(|_| ())
            .ok_or_else(|| DidError::new(ErrorCode::MetadataNotFound))
    }

    fn contains(&self, owner: &OwnerKey) -> bool {
        self.records.contains_key(owner)
    }

    fn owners(&self) -> Vec<OwnerKey> {
        let mut owners: Vec<OwnerKey> = self.records.iter().map(|r| *r.key()).collect();
        owners.sort();
        owners
    }

    fn usage(&self) -> BoxUsage {
        let boxes = self.records.len() as u64;
        BoxUsage {
            boxes,
            bytes: boxes * (KEY_LENGTH + METADATA_SIZE) as u64,
        }
    }
}
