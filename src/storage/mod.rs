//! Ledger-side storage: pages and document metadata.

mod metadata;
mod page;

pub use metadata::*;
pub use page::*;

/// Storage footprint used for minimum balance accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoxUsage {
    /// Number of stored boxes.
    pub boxes: u64,
    /// Key and value bytes across all boxes.
    pub bytes: u64,
}

impl BoxUsage {
    pub fn add(self, other: BoxUsage) -> BoxUsage {
        BoxUsage {
            boxes: self.boxes + other.boxes,
            bytes: self.bytes + other.bytes,
        }
    }
}
