//! Common test utilities.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rand::RngCore;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

use algo_did::config::SeedDocument;
use algo_did::contract::CostModel;
use algo_did::models::{AppCall, BoxName, Method, Transaction};
use algo_did::{
    Address, AppId, Config, DidError, DidResult, ErrorCode, GroupReceipt, LedgerClient,
    LedgerParams, LocalNetwork, Metadata, OwnerKey, Resolver, ResolverServerBuilder, RetryPolicy,
    StorageClient, TransferConfig, LOCAL_NETWORK,
};

/// Ledger parameters with fees switched off, so balances can be compared exactly.
pub fn free_params() -> LedgerParams {
    LedgerParams {
        min_fee: 0,
        ..LedgerParams::default()
    }
}

pub fn test_config(params: LedgerParams) -> Config {
    Config {
        ledger: params,
        transfer: TransferConfig {
            delete_padding_calls: 4,
            retry: RetryPolicy::immediate(3),
        },
        ..Config::default()
    }
}

/// Deploys a storage application on a fresh in-process ledger.
pub fn deploy(params: LedgerParams) -> LocalNetwork {
    LocalNetwork::deploy(&test_config(params)).unwrap()
}

/// A storage client for `network` that talks through `ledger`.
pub fn client_through(network: &LocalNetwork, ledger: Arc<dyn LedgerClient>) -> StorageClient {
    StorageClient::new(
        ledger,
        network.app_id,
        network.admin,
        network.client.config().clone(),
    )
}

pub fn resolver_for(network: &LocalNetwork) -> Resolver {
    Resolver::new().with_network(LOCAL_NETWORK, network.ledger.clone())
}

pub fn upload_cost(params: &LedgerParams, num_pages: u64, last_page_size: u64) -> u64 {
    CostModel::new(params)
        .upload_cost(num_pages, last_page_size)
        .unwrap()
}

/// Random bytes of the given length.
pub fn random_bytes(len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    Bytes::from(data)
}

/// A JSON object of exactly `len` bytes (at least 10).
pub fn json_document(len: usize) -> Bytes {
    assert!(len >= 10);
    Bytes::from(format!(r#"{{"pad":"{}"}}"#, "a".repeat(len - 10)))
}

pub fn app_call(network: &LocalNetwork, method: Method, boxes: Vec<BoxName>) -> Transaction {
    AppCall::new(network.admin, network.app_id, method)
        .with_boxes(boxes)
        .into()
}

/// `[payment, startUpload]` paying `amount`.
pub fn start_upload_group(
    network: &LocalNetwork,
    owner: OwnerKey,
    num_pages: u64,
    last_page_size: u64,
    amount: u64,
) -> Vec<Transaction> {
    vec![
        Transaction::Payment {
            sender: network.admin,
            receiver: Address::for_application(network.app_id),
            amount,
        },
        app_call(
            network,
            Method::StartUpload {
                owner,
                num_pages,
                last_page_size,
            },
            vec![BoxName::Metadata(owner)],
        ),
    ]
}

/// A write call carrying seven page references and the metadata reference.
pub fn write_call(
    network: &LocalNetwork,
    owner: OwnerKey,
    page: u64,
    offset: u64,
    data: &[u8],
) -> Transaction {
    let mut boxes = vec![BoxName::Page(page); 7];
    boxes.push(BoxName::Metadata(owner));
    app_call(
        network,
        Method::Write {
            owner,
            page,
            offset,
            data: Bytes::copy_from_slice(data),
        },
        boxes,
    )
}

pub async fn metadata(network: &LocalNetwork, owner: &OwnerKey) -> Option<Metadata> {
    network
        .ledger
        .metadata(network.app_id, owner)
        .await
        .unwrap()
}

pub async fn balance(network: &LocalNetwork, address: &Address) -> u64 {
    network.ledger.balance(address).await.unwrap()
}

type GroupFilter = Box<dyn Fn(&[Transaction]) -> bool + Send + Sync>;

/// Wraps a ledger and injects transient failures and corrupted reads.
pub struct FlakyLedger {
    inner: Arc<dyn LedgerClient>,
    transient_failures: AtomicU32,
    submissions: AtomicU32,
    blocked: Mutex<Option<GroupFilter>>,
    corrupt_pages: AtomicBool,
}

impl FlakyLedger {
    pub fn new(inner: Arc<dyn LedgerClient>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            transient_failures: AtomicU32::new(0),
            submissions: AtomicU32::new(0),
            blocked: Mutex::new(None),
            corrupt_pages: AtomicBool::new(false),
        })
    }

    /// Fails the next `n` submissions.
    pub fn fail_next(&self, n: u32) {
        self.transient_failures.store(n, Ordering::SeqCst);
    }

    /// Fails every submission whose group matches `filter` until healed.
    pub fn block(&self, filter: impl Fn(&[Transaction]) -> bool + Send + Sync + 'static) {
        *self.blocked.lock() = Some(Box::new(filter));
    }

    pub fn heal(&self) {
        *self.blocked.lock() = None;
        self.transient_failures.store(0, Ordering::SeqCst);
    }

    /// Flips the first byte of every page read.
    pub fn corrupt_pages(&self, corrupt: bool) {
        self.corrupt_pages.store(corrupt, Ordering::SeqCst);
    }

    /// Number of submissions seen, including failed ones.
    pub fn submissions(&self) -> u32 {
        self.submissions.load(Ordering::SeqCst)
    }
}

/// Whether `group` contains a call of `method_name`.
pub fn calls(group: &[Transaction], method_name: &str) -> bool {
    group
        .iter()
        .filter_map(Transaction::as_app_call)
        .any(|call| call.method.name() == method_name)
}

/// Whether `group` deletes `page`.
pub fn deletes_page(group: &[Transaction], page: u64) -> bool {
    group
        .iter()
        .filter_map(Transaction::as_app_call)
        .any(|call| matches!(call.method, Method::DeletePage { page: p, .. } if p == page))
}

#[async_trait]
impl LedgerClient for FlakyLedger {
    fn params(&self) -> &LedgerParams {
        self.inner.params()
    }

    async fn submit_group(&self, group: Vec<Transaction>) -> DidResult<GroupReceipt> {
        self.submissions.fetch_add(1, Ordering::SeqCst);

        let injected = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let blocked = self
            .blocked
            .lock()
            .as_ref()
            .map(|filter| filter(&group))
            .unwrap_or(false);
        if injected || blocked {
            return Err(DidError::with_message(
                ErrorCode::LedgerUnavailable,
                "injected ledger outage",
            ));
        }
        self.inner.submit_group(group).await
    }

    async fn metadata(&self, app_id: AppId, owner: &OwnerKey) -> DidResult<Option<Metadata>> {
        self.inner.metadata(app_id, owner).await
    }

    async fn page(&self, app_id: AppId, index: u64) -> DidResult<Option<Bytes>> {
        let page = self.inner.page(app_id, index).await?;
        if !self.corrupt_pages.load(Ordering::SeqCst) {
            return Ok(page);
        }
        Ok(page.map(|data| {
            let mut data = data.to_vec();
            match data.first_mut() {
                Some(b) => *b ^= 0xff,
                None => data.push(0),
            }
            Bytes::from(data)
        }))
    }

    async fn balance(&self, address: &Address) -> DidResult<u64> {
        self.inner.balance(address).await
    }

    async fn min_balance(&self, address: &Address) -> DidResult<u64> {
        self.inner.min_balance(address).await
    }
}

/// Test server wrapper.
pub struct TestServer {
    pub base_url: String,
}

impl TestServer {
    /// Starts a resolver for `resolver` on a random port.
    pub async fn start(resolver: Resolver) -> Self {
        // Find an available port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let server = ResolverServerBuilder::new()
            .host("127.0.0.1")
            .port(port)
            .resolver(resolver)
            .build();
        let base_url = server.base_url();

        // Start server in background
        tokio::spawn(async move {
            server.run().await.unwrap();
        });

        // Wait for server to be ready
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self { base_url }
    }

    /// Returns the resolution URL of an identifier.
    pub fn identifier_url(&self, did: &str) -> String {
        format!("{}/{}", self.base_url, did)
    }
}

/// Writes `document` to a temporary file and returns a seed for it.
pub fn seed_file(owner: OwnerKey, document: &[u8]) -> (tempfile::TempDir, SeedDocument) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("document.json");
    std::fs::write(&path, document).unwrap();
    (dir, SeedDocument { owner, path })
}
