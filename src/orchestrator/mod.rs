//! Off-ledger transfer protocol.
//!
//! [`StorageClient`] drives documents into and out of a storage application
//! through a [`LedgerClient`]: uploads are split into page segments and
//! envelope-sized chunks, deletions walk the page range in order.

mod delete;
mod upload;

pub use delete::*;
pub use upload::*;

use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::TransferConfig;
use crate::error::DidResult;
use crate::ledger::{GroupReceipt, LedgerClient};
use crate::models::{Address, AppCall, AppId, BoxName, Method, Transaction};

/// Administrator-side client of one storage application.
#[derive(Clone)]
pub struct StorageClient {
    ledger: Arc<dyn LedgerClient>,
    app_id: AppId,
    sender: Address,
    config: TransferConfig,
}

impl StorageClient {
    /// `sender` must be the creator of `app_id`.
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        app_id: AppId,
        sender: Address,
        config: TransferConfig,
    ) -> Self {
        Self {
            ledger,
            app_id,
            sender,
            config,
        }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    fn app_call(&self, method: Method, boxes: impl IntoIterator<Item = BoxName>) -> Transaction {
        AppCall::new(self.sender, self.app_id, method)
            .with_boxes(boxes)
            .into()
    }

    /// Submits `group`, retrying transient failures with linear backoff.
    async fn submit(&self, label: &str, group: Vec<Transaction>) -> DidResult<GroupReceipt> {
        let policy = &self.config.retry;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if !policy.submit_delay.is_zero() {
                tokio::time::sleep(policy.submit_delay).await;
            }

            match self.ledger.submit_group(group.clone()).await {
                Ok(receipt) => {
                    debug!("{} committed as group {}", label, receipt.group_id);
                    return Ok(receipt);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(
                        "{} failed (attempt {}/{}): {}",
                        label, attempt, max_attempts, e
                    );
                    tokio::time::sleep(policy.backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!("{} failed after {} attempts: {}", label, attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}
