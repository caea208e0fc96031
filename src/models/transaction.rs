//! Transactions, application calls and box references.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::address::{Address, AppId, OwnerKey, KEY_LENGTH};

/// Encoded size of a method selector.
pub const SELECTOR_SIZE: usize = 4;
/// Encoded size of an owner key argument (length prefix plus key).
pub const OWNER_ARG_SIZE: usize = 2 + KEY_LENGTH;
/// Encoded size of an integer argument.
pub const UINT_ARG_SIZE: usize = 8;

/// Name of a box an application call may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BoxName {
    /// A data page, keyed by its index.
    Page(u64),
    /// A metadata record, keyed by the owner's public key.
    Metadata(OwnerKey),
}

/// Storage contract methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// Allocates pages; must directly follow the payment covering them.
    StartUpload {
        owner: OwnerKey,
        num_pages: u64,
        last_page_size: u64,
    },
    Write {
        owner: OwnerKey,
        page: u64,
        offset: u64,
        data: Bytes,
    },
    FinishUpload {
        owner: OwnerKey,
    },
    StartDelete {
        owner: OwnerKey,
    },
    DeletePage {
        owner: OwnerKey,
        page: u64,
    },
    UpdateApplication,
    Dummy,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Method::StartUpload { .. } => "startUpload",
            Method::Write { .. } => "upload",
            Method::FinishUpload { .. } => "finishUpload",
            Method::StartDelete { .. } => "startDelete",
            Method::DeletePage { .. } => "deleteData",
            Method::UpdateApplication => "updateApplication",
            Method::Dummy => "dummy",
        }
    }

    /// Encoded size of the selector and arguments.
    pub fn encoded_len(&self) -> usize {
        SELECTOR_SIZE
            + match self {
                Method::StartUpload { .. } => OWNER_ARG_SIZE + 2 * UINT_ARG_SIZE,
                Method::Write { data, .. } => OWNER_ARG_SIZE + 2 * UINT_ARG_SIZE + data.len(),
                Method::FinishUpload { .. } | Method::StartDelete { .. } => OWNER_ARG_SIZE,
                Method::DeletePage { .. } => OWNER_ARG_SIZE + UINT_ARG_SIZE,
                Method::UpdateApplication | Method::Dummy => 0,
            }
    }
}

/// A call into an application, with the boxes it makes available to the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppCall {
    pub sender: Address,
    pub app_id: AppId,
    pub method: Method,
    pub boxes: Vec<BoxName>,
}

impl AppCall {
    pub fn new(sender: Address, app_id: AppId, method: Method) -> Self {
        Self {
            sender,
            app_id,
            method,
            boxes: Vec::new(),
        }
    }

    pub fn with_boxes(mut self, boxes: impl IntoIterator<Item = BoxName>) -> Self {
        self.boxes.extend(boxes);
        self
    }
}

/// A top-level ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    Payment {
        sender: Address,
        receiver: Address,
        amount: u64,
    },
    AppCall(AppCall),
}

impl Transaction {
    pub fn sender(&self) -> Address {
        match self {
            Transaction::Payment { sender, .. } => *sender,
            Transaction::AppCall(call) => call.sender,
        }
    }

    pub fn as_app_call(&self) -> Option<&AppCall> {
        match self {
            Transaction::AppCall(call) => Some(call),
            Transaction::Payment { .. } => None,
        }
    }
}

impl From<AppCall> for Transaction {
    fn from(call: AppCall) -> Self {
        Transaction::AppCall(call)
    }
}
