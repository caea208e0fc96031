//! The storage contract: allocates page ranges, accepts chunked writes and
//! tears documents down page by page with exact reserve refunds.
//!
//! The contract holds no state of its own. Every call runs against a
//! [`ContractEnv`] supplied by the ledger, which stages the effects of the
//! whole atomic group and discards them if any call fails.

mod cost;

pub use cost::*;

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{DidError, DidResult, ErrorCode};
use crate::models::{Address, Metadata, Method, OwnerKey, Status};

/// What the contract may observe and mutate during one call.
pub trait ContractEnv {
    /// Sender of the current call.
    fn sender(&self) -> Address;

    /// Creator of the application; the only account allowed to call it.
    fn creator(&self) -> Address;

    /// Escrow account of the application.
    fn app_address(&self) -> Address;

    /// The payment directly preceding this call in the group, as
    /// `(receiver, amount)`.
    fn preceding_payment(&self) -> Option<(Address, u64)>;

    /// Next unallocated page index.
    fn cursor(&self) -> u64;

    fn set_cursor(&mut self, cursor: u64);

    fn metadata(&mut self, owner: &OwnerKey) -> DidResult<Option<Metadata>>;

    fn put_metadata(&mut self, owner: OwnerKey, metadata: Metadata);

    fn remove_metadata(&mut self, owner: &OwnerKey);

    /// Creates a zero-filled page; fails if it already exists.
    fn create_page(&mut self, index: u64, capacity: u64) -> DidResult<()>;

    fn replace_page(&mut self, index: u64, offset: u64, data: &[u8]) -> DidResult<()>;

    fn delete_page(&mut self, index: u64) -> DidResult<()>;

    /// Current minimum balance of the application account.
    fn app_min_balance(&self) -> u64;

    /// Inner payment from the application account.
    fn pay(&mut self, receiver: Address, amount: u64) -> DidResult<()>;

    fn bump_version(&mut self);
}

/// The storage contract state machine.
#[derive(Debug, Clone, Copy)]
pub struct StorageContract {
    cost: CostModel,
}

impl StorageContract {
    pub fn new(cost: CostModel) -> Self {
        Self { cost }
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost
    }

    /// Executes one method call.
    pub fn call(&self, env: &mut dyn ContractEnv, method: &Method) -> DidResult<()> {
        if env.sender() != env.creator() {
            return Err(DidError::with_message(
                ErrorCode::Unauthorized,
                format!("{} may only be called by the application creator", method.name()),
            ));
        }

        match method {
            Method::StartUpload {
                owner,
                num_pages,
                last_page_size,
            } => self.start_upload(env, owner, *num_pages, *last_page_size),
            Method::Write {
                owner,
                page,
                offset,
                data,
            } => self.write(env, owner, *page, *offset, data),
            Method::FinishUpload { owner } => self.finish_upload(env, owner),
            Method::StartDelete { owner } => self.start_delete(env, owner),
            Method::DeletePage { owner, page } => self.delete_page(env, owner, *page),
            Method::UpdateApplication => {
                env.bump_version();
                info!("Storage application updated");
                Ok(())
            }
            Method::Dummy => Ok(()),
        }
    }

    fn start_upload(
        &self,
        env: &mut dyn ContractEnv,
        owner: &OwnerKey,
        num_pages: u64,
        last_page_size: u64,
    ) -> DidResult<()> {
        if num_pages == 0 {
            return Err(DidError::with_message(
                ErrorCode::InvalidArgument,
                "a document needs at least one page",
            ));
        }
        if last_page_size > self.cost.max_page_size {
            return Err(DidError::with_message(
                ErrorCode::InvalidArgument,
                format!(
                    "last page size {} exceeds the maximum page size {}",
                    last_page_size, self.cost.max_page_size
                ),
            ));
        }
        if env.metadata(owner)?.is_some() {
            return Err(DidError::with_message(
                ErrorCode::MetadataExists,
                format!("a document already exists for {}", owner),
            ));
        }

        let start = env.cursor();
        let end = start
            .checked_add(num_pages - 1)
            .filter(|end| *end < u64::MAX)
            .ok_or_else(|| {
                DidError::with_message(ErrorCode::InvalidArgument, "page index space exhausted")
            })?;

        let required = self.cost.upload_cost(num_pages, last_page_size).ok_or_else(|| {
            DidError::with_message(ErrorCode::InvalidArgument, "storage cost overflows")
        })?;
        match env.preceding_payment() {
            Some((receiver, amount)) if receiver == env.app_address() && amount == required => {}
            Some((receiver, amount)) => {
                return Err(DidError::with_message(
                    ErrorCode::InvalidPayment,
                    format!(
                        "expected payment of {} to {}, got {} to {}",
                        required,
                        env.app_address(),
                        amount,
                        receiver
                    ),
                ))
            }
            None => {
                return Err(DidError::with_message(
                    ErrorCode::InvalidPayment,
                    "startUpload must directly follow its storage payment",
                ))
            }
        }

        env.put_metadata(*owner, Metadata::uploading(start, end, last_page_size));
        env.set_cursor(end + 1);

        info!(
            "Allocated pages {}..={} for {} ({} bytes reserved cost {})",
            start,
            end,
            owner,
            (num_pages - 1) * self.cost.max_page_size + last_page_size,
            required
        );
        Ok(())
    }

    fn write(
        &self,
        env: &mut dyn ContractEnv,
        owner: &OwnerKey,
        page: u64,
        offset: u64,
        data: &Bytes,
    ) -> DidResult<()> {
        let metadata = require_metadata(env, owner)?;
        require_status(&metadata, Status::Uploading)?;
        require_in_range(&metadata, page)?;

        if offset == 0 {
            let capacity = metadata.page_capacity(page, self.cost.max_page_size);
            env.create_page(page, capacity)?;
        }
        env.replace_page(page, offset, data)?;

        debug!("Wrote {} bytes to page {} at offset {}", data.len(), page, offset);
        Ok(())
    }

    fn finish_upload(&self, env: &mut dyn ContractEnv, owner: &OwnerKey) -> DidResult<()> {
        let mut metadata = require_metadata(env, owner)?;
        metadata.status = Status::Ready;
        env.put_metadata(*owner, metadata);
        info!("Document for {} is ready", owner);
        Ok(())
    }

    fn start_delete(&self, env: &mut dyn ContractEnv, owner: &OwnerKey) -> DidResult<()> {
        let mut metadata = require_metadata(env, owner)?;
        require_status(&metadata, Status::Ready)?;
        metadata.status = Status::Deleting;
        env.put_metadata(*owner, metadata);
        info!("Deleting document for {}", owner);
        Ok(())
    }

    fn delete_page(&self, env: &mut dyn ContractEnv, owner: &OwnerKey, page: u64) -> DidResult<()> {
        let mut metadata = require_metadata(env, owner)?;
        require_status(&metadata, Status::Deleting)?;
        require_in_range(&metadata, page)?;

        if !metadata.may_delete(page) {
            return Err(DidError::with_message(
                ErrorCode::DeleteOrderViolation,
                format!(
                    "page {} cannot be deleted, last deleted page is {}",
                    page, metadata.last_deleted
                ),
            ));
        }

        let pre_mbr = env.app_min_balance();
        env.delete_page(page)?;

        if page == metadata.end {
            env.remove_metadata(owner);
            info!("Document for {} fully deleted", owner);
        } else {
            metadata.last_deleted = page;
            env.put_metadata(*owner, metadata);
        }

        let refund = pre_mbr.saturating_sub(env.app_min_balance());
        let sender = env.sender();
        env.pay(sender, refund)?;

        debug!("Deleted page {} of {}, refunded {}", page, owner, refund);
        Ok(())
    }
}

fn require_metadata(env: &mut dyn ContractEnv, owner: &OwnerKey) -> DidResult<Metadata> {
    env.metadata(owner)?.ok_or_else(|| {
        DidError::with_message(
            ErrorCode::MetadataNotFound,
            format!("no document metadata for {}", owner),
        )
    })
}

fn require_status(metadata: &Metadata, status: Status) -> DidResult<()> {
    if metadata.status != status {
        return Err(DidError::with_message(
            ErrorCode::InvalidStatus,
            format!(
                "document is {}, expected {}",
                metadata.status.as_str(),
                status.as_str()
            ),
        ));
    }
    Ok(())
}

fn require_in_range(metadata: &Metadata, page: u64) -> DidResult<()> {
    if !metadata.contains(page) {
        return Err(DidError::with_message(
            ErrorCode::PageOutOfRange,
            format!(
                "page {} is outside {}..={}",
                page, metadata.start, metadata.end
            ),
        ));
    }
    Ok(())
}
