//! Page data models.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{DidError, DidResult, ErrorCode};

/// Page constants.
pub const MAX_PAGE_SIZE: u64 = 32_768;
/// Length of a page's storage key.
pub const PAGE_KEY_SIZE: usize = 8;

/// Storage key of a page: the big-endian page index.
pub fn page_key(index: u64) -> [u8; PAGE_KEY_SIZE] {
    index.to_be_bytes()
}

/// A fixed-capacity page. The capacity is declared at creation and the
/// contents are zero-filled until written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    data: Vec<u8>,
}

impl Page {
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            data: vec![0u8; capacity as usize],
        }
    }

    pub fn capacity(&self) -> u64 {
        self.data.len() as u64
    }

    /// Replaces `data.len()` bytes starting at `offset`.
    pub fn replace(&mut self, offset: u64, data: &[u8]) -> DidResult<()> {
        let end = offset
            .checked_add(data.len() as u64)
            .filter(|end| *end <= self.capacity())
            .ok_or_else(|| {
                DidError::with_message(
                    ErrorCode::WriteOutOfBounds,
                    format!(
                        "write of {} bytes at offset {} exceeds page capacity {}",
                        data.len(),
                        offset,
                        self.capacity()
                    ),
                )
            })?;
        self.data[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.data)
    }
}

/// How a document of a given length maps onto pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLayout {
    pub num_pages: u64,
    pub last_page_size: u64,
}

impl PageLayout {
    /// Plans the pages for a document of `len` bytes.
    ///
    /// An exact multiple of the page size ends in a full page rather than an
    /// empty one, and an empty document still occupies one zero-length page.
    pub fn for_length(len: u64, max_page_size: u64) -> Self {
        if len == 0 {
            return Self {
                num_pages: 1,
                last_page_size: 0,
            };
        }
        let num_pages = len.div_ceil(max_page_size);
        let last_page_size = match len % max_page_size {
            0 => max_page_size,
            rem => rem,
        };
        Self {
            num_pages,
            last_page_size,
        }
    }

    /// Byte ranges of each page within the document, in page order.
    pub fn segments(&self, max_page_size: u64) -> impl Iterator<Item = std::ops::Range<usize>> + '_ {
        let max = max_page_size as usize;
        let last = self.num_pages as usize - 1;
        let last_size = self.last_page_size as usize;
        (0..self.num_pages as usize).map(move |i| {
            let start = i * max;
            let len = if i == last { last_size } else { max };
            start..start + len
        })
    }
}
