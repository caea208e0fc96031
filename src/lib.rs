//! algo-did: the `did:algo` method in Rust.
//!
//! DID documents live on a ledger as paged blobs. This crate provides the
//! storage contract that allocates and tears down those pages, the
//! off-ledger protocol that moves documents through size-limited atomic
//! groups, an in-process ledger enforcing those limits, and a resolver with
//! an HTTP front end.
//!
//! # Example
//!
//! ```no_run
//! use algo_did::{Config, LocalNetwork, OwnerKey, Resolver, LOCAL_NETWORK};
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() {
//!     let network = LocalNetwork::deploy(&Config::default()).unwrap();
//!     let owner = OwnerKey::from_name("alice");
//!     network
//!         .client
//!         .upload_document(owner, Bytes::from_static(br#"{"id":"alice"}"#))
//!         .await
//!         .unwrap();
//!
//!     let resolver = Resolver::new().with_network(LOCAL_NETWORK, network.ledger.clone());
//!     let did = network.identifier(owner).to_string();
//!     let document = resolver.resolve(&did).await.unwrap();
//!     assert_eq!(document.as_ref(), br#"{"id":"alice"}"#);
//! }
//! ```

pub mod config;
pub mod contract;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod network;
pub mod orchestrator;
pub mod resolver;
pub mod router;
pub mod server;
pub mod storage;

// Re-exports for convenience
pub use config::{
    Args, Config, LedgerParams, RetryPolicy, TransferConfig, DEFAULT_NETWORK,
    DEFAULT_RESOLVER_PORT, LOCAL_NETWORK,
};
pub use error::{DidError, DidResult, ErrorCode};
pub use ledger::{GroupReceipt, LedgerClient, MemoryLedger};
pub use models::{Address, AppId, DidIdentifier, Metadata, OwnerKey, Status};
pub use network::LocalNetwork;
pub use orchestrator::{DeletionProgress, DeletionReport, StorageClient};
pub use resolver::{ResolvedDocument, Resolver};
pub use server::{ResolverServer, ResolverServerBuilder};
