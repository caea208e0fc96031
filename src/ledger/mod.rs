//! Ledger access for the off-ledger components.
//!
//! Orchestrators and the resolver only see [`LedgerClient`]. The in-process
//! [`MemoryLedger`] hosts storage contracts and enforces the limits the
//! transfer protocol is built around: call envelope size, references per
//! call, calls per group, box I/O per reference and minimum balances.

mod group;
mod memory;

pub use memory::*;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::LedgerParams;
use crate::error::DidResult;
use crate::models::{Address, AppId, Metadata, OwnerKey, Transaction};

/// Trait for submitting atomic groups and reading application boxes.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Rules of the ledger behind this client.
    fn params(&self) -> &LedgerParams;

    /// Submits an atomic group; either every transaction applies or none does.
    async fn submit_group(&self, group: Vec<Transaction>) -> DidResult<GroupReceipt>;

    /// Reads the metadata record of `owner` in application `app_id`.
    async fn metadata(&self, app_id: AppId, owner: &OwnerKey) -> DidResult<Option<Metadata>>;

    /// Reads the full contents of a page.
    async fn page(&self, app_id: AppId, index: u64) -> DidResult<Option<Bytes>>;

    async fn balance(&self, address: &Address) -> DidResult<u64>;

    async fn min_balance(&self, address: &Address) -> DidResult<u64>;
}

/// A payment issued by an application during a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnerPayment {
    pub sender: Address,
    pub receiver: Address,
    pub amount: u64,
}

/// Outcome of an accepted group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReceipt {
    pub group_id: String,
    /// Fees charged across the group.
    pub fees: u64,
    pub inner_payments: Vec<InnerPayment>,
}

impl GroupReceipt {
    /// Total paid to `receiver` by inner payments.
    pub fn paid_to(&self, receiver: &Address) -> u64 {
        self.inner_payments
            .iter()
            .filter(|p| &p.receiver == receiver)
            .map(|p| p.amount)
            .sum()
    }
}
