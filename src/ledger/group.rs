//! Staged execution of one atomic group.

use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::LedgerParams;
use crate::contract::{ContractEnv, CostModel};
use crate::error::{DidError, DidResult, ErrorCode};
use crate::models::{
    Address, AppId, BoxName, Metadata, OwnerKey, Page, Transaction, KEY_LENGTH, METADATA_SIZE,
    PAGE_KEY_SIZE,
};
use crate::storage::BoxUsage;

use super::memory::{AppGlobals, Application};
use super::InnerPayment;

/// Write set of a group. Reads fall through to committed storage; nothing
/// reaches committed storage until [`GroupOverlay::commit_boxes`].
pub(crate) struct GroupOverlay<'a> {
    params: &'a LedgerParams,
    cost: CostModel,
    apps: &'a DashMap<AppId, Arc<Application>>,
    app_addresses: &'a DashMap<Address, AppId>,
    pub(crate) balances: HashMap<Address, u64>,
    pub(crate) globals: HashMap<AppId, AppGlobals>,
    pages: HashMap<(AppId, u64), Option<Page>>,
    metadata: HashMap<(AppId, OwnerKey), Option<Metadata>>,
    /// Largest size seen for every box touched by the group.
    accessed: HashMap<(AppId, BoxName), u64>,
    touched: HashSet<Address>,
    pub(crate) inner_payments: Vec<InnerPayment>,
    pub(crate) fees: u64,
}

impl<'a> GroupOverlay<'a> {
    pub(crate) fn new(
        params: &'a LedgerParams,
        apps: &'a DashMap<AppId, Arc<Application>>,
        app_addresses: &'a DashMap<Address, AppId>,
        balances: HashMap<Address, u64>,
        globals: HashMap<AppId, AppGlobals>,
    ) -> Self {
        Self {
            params,
            cost: CostModel::new(params),
            apps,
            app_addresses,
            balances,
            globals,
            pages: HashMap::new(),
            metadata: HashMap::new(),
            accessed: HashMap::new(),
            touched: HashSet::new(),
            inner_payments: Vec::new(),
            fees: 0,
        }
    }

    fn debit(&mut self, address: Address, amount: u64) -> DidResult<()> {
        let balance = self.balances.entry(address).or_insert(0);
        *balance = balance.checked_sub(amount).ok_or_else(|| {
            DidError::with_message(
                ErrorCode::InsufficientBalance,
                format!("account {} cannot cover {}", address, amount),
            )
        })?;
        self.touched.insert(address);
        Ok(())
    }

    fn credit(&mut self, address: Address, amount: u64) -> DidResult<()> {
        let balance = self.balances.entry(address).or_insert(0);
        *balance = balance.checked_add(amount).ok_or_else(|| {
            DidError::with_message(ErrorCode::InvalidArgument, "balance overflow")
        })?;
        self.touched.insert(address);
        Ok(())
    }

    pub(crate) fn charge_fee(&mut self, sender: Address) -> DidResult<()> {
        self.debit(sender, self.params.min_fee)?;
        self.fees += self.params.min_fee;
        Ok(())
    }

    pub(crate) fn transfer(&mut self, from: Address, to: Address, amount: u64) -> DidResult<()> {
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    /// Includes `address` in the minimum balance check.
    pub(crate) fn mark(&mut self, address: Address) {
        self.touched.insert(address);
    }

    fn touch(&mut self, app_id: AppId, name: BoxName, size: u64) {
        let seen = self.accessed.entry((app_id, name)).or_insert(0);
        *seen = (*seen).max(size);
    }

    fn page(&self, app: &Application, index: u64) -> Option<Page> {
        match self.pages.get(&(app.id, index)) {
            Some(staged) => staged.clone(),
            None => app.pages.get(index),
        }
    }

    /// Minimum balance of `address` including staged box changes.
    pub(crate) fn min_balance(&self, address: &Address) -> u64 {
        let base = self.params.account_min_balance;
        let Some(app_id) = self.app_addresses.get(address).map(|a| *a.value()) else {
            return base;
        };
        let Some(app) = self.apps.get(&app_id).map(|a| a.value().clone()) else {
            return base;
        };

        let committed = app.pages.usage().add(app.registry.usage());
        let (mut boxes, mut bytes) = (committed.boxes as i64, committed.bytes as i64);

        for ((id, index), staged) in &self.pages {
            if *id != app_id {
                continue;
            }
            if let Some(capacity) = app.pages.capacity(*index) {
                boxes -= 1;
                bytes -= (PAGE_KEY_SIZE as u64 + capacity) as i64;
            }
            if let Some(page) = staged {
                boxes += 1;
                bytes += (PAGE_KEY_SIZE as u64 + page.capacity()) as i64;
            }
        }
        let record_bytes = (KEY_LENGTH + METADATA_SIZE) as i64;
        for ((id, owner), staged) in &self.metadata {
            if *id != app_id {
                continue;
            }
            if app.registry.contains(owner) {
                boxes -= 1;
                bytes -= record_bytes;
            }
            if staged.is_some() {
                boxes += 1;
                bytes += record_bytes;
            }
        }

        base + self.cost.reserve(BoxUsage {
            boxes: boxes.max(0) as u64,
            bytes: bytes.max(0) as u64,
        })
    }

    /// Every touched box must be referenced by some call in the group, and
    /// the bytes touched must fit the I/O granted by the group's references.
    pub(crate) fn check_io_budget(&self, group: &[Transaction]) -> DidResult<()> {
        let mut referenced = HashSet::new();
        let mut references = 0u64;
        for call in group.iter().filter_map(Transaction::as_app_call) {
            references += call.boxes.len() as u64;
            referenced.extend(call.boxes.iter().map(|b| (call.app_id, *b)));
        }

        for (key, _) in self.accessed.iter() {
            if !referenced.contains(key) {
                return Err(DidError::with_message(
                    ErrorCode::MissingReference,
                    format!("box {:?} of app {} is not referenced by the group", key.1, key.0),
                ));
            }
        }

        let used: u64 = self.accessed.values().sum();
        let budget = references * self.params.io_bytes_per_reference;
        if used > budget {
            return Err(DidError::with_message(
                ErrorCode::IoBudgetExceeded,
                format!(
                    "group touches {} box bytes but its {} references allow {}",
                    used, references, budget
                ),
            ));
        }
        Ok(())
    }

    pub(crate) fn check_min_balances(&self) -> DidResult<()> {
        for address in &self.touched {
            let balance = self.balances.get(address).copied().unwrap_or(0);
            let required = self.min_balance(address);
            if balance < required {
                return Err(DidError::with_message(
                    ErrorCode::InsufficientBalance,
                    format!(
                        "account {} would hold {} below its minimum balance {}",
                        address, balance, required
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Applies staged box changes to committed storage.
    pub(crate) fn commit_boxes(&mut self) {
        for ((app_id, index), staged) in self.pages.drain() {
            let Some(app) = self.apps.get(&app_id).map(|a| a.value().clone()) else {
                continue;
            };
            match staged {
                Some(page) => app.pages.put(index, page),
                None => {
                    // Pages created and deleted inside the group never reached the store
                    let _ = app.pages.remove(index);
                }
            }
        }
        for ((app_id, owner), staged) in self.metadata.drain() {
            let Some(app) = self.apps.get(&app_id).map(|a| a.value().clone()) else {
                continue;
            };
            match staged {
                Some(metadata) => app.registry.put(owner, metadata),
                None => {
                    let _ = app.registry.remove(&owner);
                }
            }
        }
    }
}

/// Environment of a single application call within a group.
pub(crate) struct CallEnv<'o, 'a> {
    pub(crate) overlay: &'o mut GroupOverlay<'a>,
    pub(crate) app: Arc<Application>,
    pub(crate) sender: Address,
    pub(crate) preceding_payment: Option<(Address, u64)>,
}

impl ContractEnv for CallEnv<'_, '_> {
    fn sender(&self) -> Address {
        self.sender
    }

    fn creator(&self) -> Address {
        self.app.creator
    }

    fn app_address(&self) -> Address {
        self.app.address
    }

    fn preceding_payment(&self) -> Option<(Address, u64)> {
        self.preceding_payment
    }

    fn cursor(&self) -> u64 {
        self.overlay
            .globals
            .get(&self.app.id)
            .map(|g| g.cursor)
            .unwrap_or(0)
    }

    fn set_cursor(&mut self, cursor: u64) {
        self.overlay.globals.entry(self.app.id).or_default().cursor = cursor;
    }

    fn metadata(&mut self, owner: &OwnerKey) -> DidResult<Option<Metadata>> {
        self.overlay
            .touch(self.app.id, BoxName::Metadata(*owner), METADATA_SIZE as u64);
        match self.overlay.metadata.get(&(self.app.id, *owner)) {
            Some(staged) => Ok(*staged),
            None => self.app.registry.get(owner),
        }
    }

    fn put_metadata(&mut self, owner: OwnerKey, metadata: Metadata) {
        self.overlay
            .touch(self.app.id, BoxName::Metadata(owner), METADATA_SIZE as u64);
        self.overlay
            .metadata
            .insert((self.app.id, owner), Some(metadata));
    }

    fn remove_metadata(&mut self, owner: &OwnerKey) {
        self.overlay
            .touch(self.app.id, BoxName::Metadata(*owner), METADATA_SIZE as u64);
        self.overlay.metadata.insert((self.app.id, *owner), None);
    }

    fn create_page(&mut self, index: u64, capacity: u64) -> DidResult<()> {
        self.overlay.touch(self.app.id, BoxName::Page(index), capacity);
        if self.overlay.page(&self.app, index).is_some() {
            return Err(DidError::with_message(
                ErrorCode::PageExists,
                format!("page {} already exists", index),
            ));
        }
        self.overlay
            .pages
            .insert((self.app.id, index), Some(Page::with_capacity(capacity)));
        Ok(())
    }

    fn replace_page(&mut self, index: u64, offset: u64, data: &[u8]) -> DidResult<()> {
        let mut page = self.overlay.page(&self.app, index).ok_or_else(|| {
            DidError::with_message(
                ErrorCode::PageNotFound,
                format!("page {} must be created by a write at offset 0", index),
            )
        })?;
        self.overlay
            .touch(self.app.id, BoxName::Page(index), page.capacity());
        page.replace(offset, data)?;
        self.overlay.pages.insert((self.app.id, index), Some(page));
        Ok(())
    }

    fn delete_page(&mut self, index: u64) -> DidResult<()> {
        let page = self.overlay.page(&self.app, index).ok_or_else(|| {
            DidError::with_message(ErrorCode::PageNotFound, format!("page {} does not exist", index))
        })?;
        self.overlay
            .touch(self.app.id, BoxName::Page(index), page.capacity());
        self.overlay.pages.insert((self.app.id, index), None);
        Ok(())
    }

    fn app_min_balance(&self) -> u64 {
        self.overlay.min_balance(&self.app.address)
    }

    fn pay(&mut self, receiver: Address, amount: u64) -> DidResult<()> {
        self.overlay.transfer(self.app.address, receiver, amount)?;
        self.overlay.inner_payments.push(InnerPayment {
            sender: self.app.address,
            receiver,
            amount,
        });
        Ok(())
    }

    fn bump_version(&mut self) {
        self.overlay.globals.entry(self.app.id).or_default().version += 1;
    }
}
