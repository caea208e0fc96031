//! In-process ledger hosting storage applications.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::LedgerParams;
use crate::contract::{CostModel, StorageContract};
use crate::error::{DidError, DidResult, ErrorCode};
use crate::models::{Address, AppId, Metadata, OwnerKey, Transaction};
use crate::storage::{MemoryMetadataRegistry, MemoryPageStore, MetadataRegistry, PageStore};

use super::group::{CallEnv, GroupOverlay};
use super::{GroupReceipt, LedgerClient};

/// First identifier handed out by [`MemoryLedger::create_application`].
pub const FIRST_APP_ID: AppId = 1_001;

/// A deployed storage application and its committed boxes.
pub struct Application {
    pub id: AppId,
    pub creator: Address,
    /// Escrow account holding the storage reserve.
    pub address: Address,
    pub(crate) pages: Arc<dyn PageStore>,
    pub(crate) registry: Arc<dyn MetadataRegistry>,
}

/// Global state of an application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppGlobals {
    /// Next unallocated page index.
    pub cursor: u64,
    /// Number of accepted application updates.
    pub version: u64,
}

struct LedgerState {
    balances: HashMap<Address, u64>,
    globals: HashMap<AppId, AppGlobals>,
    next_app_id: AppId,
}

/// Ledger kept entirely in memory.
///
/// Groups are serialized by a single lock; reads of committed boxes go
/// straight to the per-application stores.
pub struct MemoryLedger {
    params: LedgerParams,
    contract: StorageContract,
    apps: DashMap<AppId, Arc<Application>>,
    app_addresses: DashMap<Address, AppId>,
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new(params: LedgerParams) -> Self {
        let contract = StorageContract::new(CostModel::new(&params));
        Self {
            params,
            contract,
            apps: DashMap::new(),
            app_addresses: DashMap::new(),
            state: Mutex::new(LedgerState {
                balances: HashMap::new(),
                globals: HashMap::new(),
                next_app_id: FIRST_APP_ID,
            }),
        }
    }

    /// Credits `amount` to `address` out of thin air.
    pub fn fund(&self, address: Address, amount: u64) {
        let mut state = self.state.lock();
        let balance = state.balances.entry(address).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Deploys a storage application owned by `creator`.
    ///
    /// The application account starts empty; fund it with the account
    /// minimum balance before the first upload.
    pub fn create_application(&self, creator: Address) -> AppId {
        let mut state = self.state.lock();
        let id = state.next_app_id;
        state.next_app_id += 1;
        state.globals.insert(id, AppGlobals::default());

        let app = Application {
            id,
            creator,
            address: Address::for_application(id),
            pages: Arc::new(MemoryPageStore::new()),
            registry: Arc::new(MemoryMetadataRegistry::new()),
        };
        self.app_addresses.insert(app.address, id);
        debug!("Created application {} with escrow {}", id, app.address);
        self.apps.insert(id, Arc::new(app));
        id
    }

    pub fn application(&self, app_id: AppId) -> DidResult<Arc<Application>> {
        self.apps
            .get(&app_id)
            .map(|a| a.value().clone())
            .ok_or_else(|| {
                DidError::with_message(
                    ErrorCode::ApplicationNotFound,
                    format!("application {} does not exist", app_id),
                )
            })
    }

    pub fn globals(&self, app_id: AppId) -> DidResult<AppGlobals> {
        self.application(app_id)?;
        Ok(self
            .state
            .lock()
            .globals
            .get(&app_id)
            .copied()
            .unwrap_or_default())
    }

    /// Owners with a metadata record in `app_id`.
    pub fn owners(&self, app_id: AppId) -> DidResult<Vec<OwnerKey>> {
        Ok(self.application(app_id)?.registry.owners())
    }

    /// Rejects groups that break the static limits before anything executes.
    fn check_limits(&self, group: &[Transaction]) -> DidResult<()> {
        if group.is_empty() {
            return Err(DidError::with_message(
                ErrorCode::InvalidArgument,
                "cannot submit an empty group",
            ));
        }
        if group.len() > self.params.max_group_calls {
            return Err(DidError::with_message(
                ErrorCode::GroupTooLarge,
                format!(
                    "group has {} transactions, limit is {}",
                    group.len(),
                    self.params.max_group_calls
                ),
            ));
        }
        for call in group.iter().filter_map(Transaction::as_app_call) {
            if call.boxes.len() > self.params.max_references_per_call {
                return Err(DidError::with_message(
                    ErrorCode::TooManyReferences,
                    format!(
                        "{} carries {} box references, limit is {}",
                        call.method.name(),
                        call.boxes.len(),
                        self.params.max_references_per_call
                    ),
                ));
            }
            let len = call.method.encoded_len();
            if len > self.params.max_envelope_bytes {
                return Err(DidError::with_message(
                    ErrorCode::EnvelopeTooLarge,
                    format!(
                        "{} encodes to {} bytes, limit is {}",
                        call.method.name(),
                        len,
                        self.params.max_envelope_bytes
                    ),
                ));
            }
            self.application(call.app_id)?;
        }
        Ok(())
    }

    fn execute(&self, group: &[Transaction]) -> DidResult<GroupReceipt> {
        self.check_limits(group)?;

        let mut state = self.state.lock();
        let mut overlay = GroupOverlay::new(
            &self.params,
            &self.apps,
            &self.app_addresses,
            state.balances.clone(),
            state.globals.clone(),
        );

        for (i, txn) in group.iter().enumerate() {
            overlay.charge_fee(txn.sender())?;
            match txn {
                Transaction::Payment {
                    sender,
                    receiver,
                    amount,
                } => overlay.transfer(*sender, *receiver, *amount)?,
                Transaction::AppCall(call) => {
                    let preceding_payment = i
                        .checked_sub(1)
                        .and_then(|prev| match &group[prev] {
                            Transaction::Payment {
                                receiver, amount, ..
                            } => Some((*receiver, *amount)),
                            Transaction::AppCall(_) => None,
                        });
                    let app = self.application(call.app_id)?;
                    overlay.mark(app.address);
                    let mut env = CallEnv {
                        overlay: &mut overlay,
                        app,
                        sender: call.sender,
                        preceding_payment,
                    };
                    self.contract.call(&mut env, &call.method)?;
                }
            }
        }

        overlay.check_io_budget(group)?;
        overlay.check_min_balances()?;

        overlay.commit_boxes();
        state.balances = std::mem::take(&mut overlay.balances);
        state.globals = std::mem::take(&mut overlay.globals);

        Ok(GroupReceipt {
            group_id: Uuid::new_v4().to_string(),
            fees: overlay.fees,
            inner_payments: std::mem::take(&mut overlay.inner_payments),
        })
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    fn params(&self) -> &LedgerParams {
        &self.params
    }

    async fn submit_group(&self, group: Vec<Transaction>) -> DidResult<GroupReceipt> {
        match self.execute(&group) {
            Ok(receipt) => {
                debug!(
                    "Group {} accepted ({} transactions, fees {})",
                    receipt.group_id,
                    group.len(),
                    receipt.fees
                );
                Ok(receipt)
            }
            Err(e) => {
                warn!("Group of {} transactions rejected: {}", group.len(), e);
                Err(e)
            }
        }
    }

    async fn metadata(&self, app_id: AppId, owner: &OwnerKey) -> DidResult<Option<Metadata>> {
        self.application(app_id)?.registry.get(owner)
    }

    async fn page(&self, app_id: AppId, index: u64) -> DidResult<Option<Bytes>> {
        Ok(self.application(app_id)?.pages.read(index))
    }

    async fn balance(&self, address: &Address) -> DidResult<u64> {
        Ok(self
            .state
            .lock()
            .balances
            .get(address)
            .copied()
            .unwrap_or(0))
    }

    async fn min_balance(&self, address: &Address) -> DidResult<u64> {
        let overlay = GroupOverlay::new(
            &self.params,
            &self.apps,
            &self.app_addresses,
            HashMap::new(),
            HashMap::new(),
        );
        Ok(overlay.min_balance(address))
    }
}
