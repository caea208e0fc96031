//! Storage reservation costs.

use crate::config::LedgerParams;
use crate::models::{PageLayout, KEY_LENGTH, METADATA_SIZE, PAGE_KEY_SIZE};
use crate::storage::BoxUsage;

/// Prices box storage the way the ledger reserves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostModel {
    pub box_flat_cost: u64,
    pub box_byte_cost: u64,
    pub max_page_size: u64,
}

impl CostModel {
    pub fn new(params: &LedgerParams) -> Self {
        Self {
            box_flat_cost: params.box_flat_cost,
            box_byte_cost: params.box_byte_cost,
            max_page_size: params.max_page_size,
        }
    }

    /// Reserve held for a set of boxes.
    pub fn reserve(&self, usage: BoxUsage) -> u64 {
        usage.boxes * self.box_flat_cost + usage.bytes * self.box_byte_cost
    }

    /// Exact payment `start-upload` requires for `num_pages` pages whose last
    /// page holds `last_page_size` bytes. Returns `None` on overflow.
    pub fn upload_cost(&self, num_pages: u64, last_page_size: u64) -> Option<u64> {
        let full_pages = num_pages.checked_sub(1)?;

        let page_boxes = num_pages.checked_mul(self.box_flat_cost)?;
        let page_data = full_pages
            .checked_mul(self.max_page_size)?
            .checked_add(last_page_size)?
            .checked_mul(self.box_byte_cost)?;
        let page_keys = num_pages
            .checked_mul(PAGE_KEY_SIZE as u64)?
            .checked_mul(self.box_byte_cost)?;
        let metadata_box =
            self.box_flat_cost + (KEY_LENGTH + METADATA_SIZE) as u64 * self.box_byte_cost;

        page_boxes
            .checked_add(page_data)?
            .checked_add(page_keys)?
            .checked_add(metadata_box)
    }

    pub fn layout_cost(&self, layout: &PageLayout) -> Option<u64> {
        self.upload_cost(layout.num_pages, layout.last_page_size)
    }
}
