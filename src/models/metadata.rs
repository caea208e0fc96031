//! Document metadata records and their on-ledger layout.

use serde::{Deserialize, Serialize};

use crate::error::{DidError, DidResult, ErrorCode};

/// Encoded size of a metadata record:
/// `(start: u64, end: u64, status: u8, endSize: u64, lastDeleted: u64)`.
pub const METADATA_SIZE: usize = 8 + 8 + 1 + 8 + 8;

/// Lifecycle status of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Pages are being written and may not be readable yet.
    Uploading,
    /// Every page is written; the document can be resolved.
    Ready,
    /// Pages are being removed in ascending order.
    Deleting,
}

impl Status {
    pub fn as_byte(&self) -> u8 {
        match self {
            Status::Uploading => 0,
            Status::Ready => 1,
            Status::Deleting => 2,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Status::Uploading),
            1 => Some(Status::Ready),
            2 => Some(Status::Deleting),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Uploading => "uploading",
            Status::Ready => "ready",
            Status::Deleting => "deleting",
        }
    }
}

/// Describes where a document lives and how far its lifecycle has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// First page index (inclusive).
    pub start: u64,
    /// Last page index (inclusive).
    pub end: u64,
    pub status: Status,
    /// Size of the last page; every other page is full.
    pub end_size: u64,
    /// Most recently deleted page, meaningful only while deleting.
    pub last_deleted: u64,
}

impl Metadata {
    /// A fresh record for a document occupying `start..=end`.
    pub fn uploading(start: u64, end: u64, end_size: u64) -> Self {
        Self {
            start,
            end,
            status: Status::Uploading,
            end_size,
            last_deleted: 0,
        }
    }

    /// Number of pages in the document.
    pub fn num_pages(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Whether `index` lies within this document's page range.
    pub fn contains(&self, index: u64) -> bool {
        self.start <= index && index <= self.end
    }

    /// Whether `index` is the next page the deletion order allows.
    pub fn may_delete(&self, index: u64) -> bool {
        index == self.start || self.last_deleted.checked_add(1) == Some(index)
    }

    /// Capacity a page is created with.
    pub fn page_capacity(&self, index: u64, max_page_size: u64) -> u64 {
        if index == self.end {
            self.end_size
        } else {
            max_page_size
        }
    }

    pub fn encode(&self) -> [u8; METADATA_SIZE] {
        let mut buf = [0u8; METADATA_SIZE];
        buf[0..8].copy_from_slice(&self.start.to_be_bytes());
        buf[8..16].copy_from_slice(&self.end.to_be_bytes());
        buf[16] = self.status.as_byte();
        buf[17..25].copy_from_slice(&self.end_size.to_be_bytes());
        buf[25..33].copy_from_slice(&self.last_deleted.to_be_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> DidResult<Self> {
        if bytes.len() != METADATA_SIZE {
            return Err(DidError::with_message(
                ErrorCode::Corrupted,
                format!(
                    "metadata record must be {} bytes, got {}",
                    METADATA_SIZE,
                    bytes.len()
                ),
            ));
        }
        let status = Status::from_byte(bytes[16]).ok_or_else(|| {
            DidError::with_message(
                ErrorCode::Corrupted,
                format!("unknown metadata status {}", bytes[16]),
            )
        })?;
        Ok(Self {
            start: read_u64(&bytes[0..8]),
            end: read_u64(&bytes[8..16]),
            status,
            end_size: read_u64(&bytes[17..25]),
            last_deleted: read_u64(&bytes[25..33]),
        })
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_be_bytes(buf)
}
