//! Resolver, ledger and transfer configuration.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DidError, DidResult, ErrorCode};
use crate::models::OwnerKey;

/// Default resolver port.
pub const DEFAULT_RESOLVER_PORT: u16 = 8080;

/// Network used when an identifier carries no network segment.
pub const DEFAULT_NETWORK: &str = "mainnet";

/// Network served by the in-process ledger of the binary.
pub const LOCAL_NETWORK: &str = "custom";

/// Command-line arguments for the resolver.
#[derive(Parser, Debug, Clone)]
#[command(name = "algo-did")]
#[command(about = "did:algo resolver backed by paged on-ledger storage")]
#[command(version)]
pub struct Args {
    /// Host address to bind to.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port for the resolver.
    #[arg(long, default_value_t = DEFAULT_RESOLVER_PORT)]
    pub port: u16,

    /// Upload a document at startup, given as OWNER_KEY_HEX=PATH. Repeatable.
    #[arg(long = "seed", value_name = "OWNER_KEY_HEX=PATH")]
    pub seeds: Vec<String>,

    /// Enable debug logging.
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Enable silent mode (minimal logging).
    #[arg(long, short = 's')]
    pub silent: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_RESOLVER_PORT,
            seeds: Vec::new(),
            debug: false,
            silent: false,
        }
    }
}

/// Ledger rules and storage cost constants.
///
/// Defaults follow the reference ledger: 32 KiB pages, 2048-byte call
/// envelopes, eight references per call, 1 KiB of box I/O per reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerParams {
    /// Flat reserve for every stored box.
    pub box_flat_cost: u64,
    /// Reserve per byte of box key and value.
    pub box_byte_cost: u64,
    /// Largest page a document may use.
    pub max_page_size: u64,
    /// Reserve every account holds regardless of storage.
    pub account_min_balance: u64,
    /// Fee charged to the sender of every top-level transaction.
    pub min_fee: u64,
    /// Largest encoded application call.
    pub max_envelope_bytes: usize,
    /// Selector, owner key, page index and offset of a write call.
    pub call_overhead_bytes: usize,
    /// Largest atomic group.
    pub max_group_calls: usize,
    /// Largest number of box references on one call.
    pub max_references_per_call: usize,
    /// Box I/O granted by each reference.
    pub io_bytes_per_reference: u64,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            box_flat_cost: 2_500,
            box_byte_cost: 400,
            max_page_size: 32_768,
            account_min_balance: 100_000,
            min_fee: 1_000,
            max_envelope_bytes: 2_048,
            call_overhead_bytes: 54,
            max_group_calls: 8,
            max_references_per_call: 8,
            io_bytes_per_reference: 1_024,
        }
    }
}

impl LedgerParams {
    /// Payload bytes that fit in one write call.
    pub fn bytes_per_call(&self) -> usize {
        self.max_envelope_bytes.saturating_sub(self.call_overhead_bytes)
    }

    pub fn validate(&self) -> DidResult<()> {
        if self.max_page_size == 0 {
            return Err(DidError::with_message(
                ErrorCode::InvalidArgument,
                "max_page_size must be non-zero",
            ));
        }
        if self.bytes_per_call() == 0 {
            return Err(DidError::with_message(
                ErrorCode::InvalidArgument,
                "max_envelope_bytes must exceed call_overhead_bytes",
            ));
        }
        if self.max_group_calls == 0 || self.max_references_per_call < 2 {
            return Err(DidError::with_message(
                ErrorCode::InvalidArgument,
                "groups need at least one call and calls at least two references",
            ));
        }
        if self.io_bytes_per_reference == 0 {
            return Err(DidError::with_message(
                ErrorCode::InvalidArgument,
                "io_bytes_per_reference must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Retry behaviour for group submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Linear backoff step; attempt `n` waits `n * backoff`.
    pub backoff: Duration,
    /// Delay before every group submission.
    pub submit_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
            submit_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy without delays, for local ledgers.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Duration::ZERO,
            submit_delay: Duration::ZERO,
        }
    }
}

/// Off-ledger transfer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// No-op calls appended to every page deletion group.
    pub delete_padding_calls: usize,
    pub retry: RetryPolicy,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            delete_padding_calls: 4,
            retry: RetryPolicy::default(),
        }
    }
}

/// A document to upload when the resolver starts.
#[derive(Debug, Clone)]
pub struct SeedDocument {
    pub owner: OwnerKey,
    pub path: PathBuf,
}

impl SeedDocument {
    /// Parses `OWNER_KEY_HEX=PATH`.
    pub fn parse(spec: &str) -> DidResult<Self> {
        let (owner, path) = spec.split_once('=').ok_or_else(|| {
            DidError::with_message(
                ErrorCode::InvalidArgument,
                format!("invalid seed '{}', expected OWNER_KEY_HEX=PATH", spec),
            )
        })?;
        Ok(Self {
            owner: OwnerKey::from_hex(owner)?,
            path: PathBuf::from(path),
        })
    }
}

/// Resolver configuration derived from command-line arguments.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to.
    pub host: String,
    /// Port for the resolver.
    pub port: u16,
    /// Enable debug logging.
    pub debug: bool,
    /// Documents uploaded at startup.
    pub seeds: Vec<SeedDocument>,
    pub ledger: LedgerParams,
    pub transfer: TransferConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_RESOLVER_PORT,
            debug: false,
            seeds: Vec::new(),
            ledger: LedgerParams::default(),
            transfer: TransferConfig {
                delete_padding_calls: 4,
                retry: RetryPolicy::immediate(3),
            },
        }
    }
}

impl TryFrom<Args> for Config {
    type Error = DidError;

    fn try_from(args: Args) -> DidResult<Self> {
        let seeds = args
            .seeds
            .iter()
            .map(|s| SeedDocument::parse(s))
            .collect::<DidResult<Vec<_>>>()?;
        Ok(Self {
            host: args.host,
            port: args.port,
            debug: args.debug,
            seeds,
            ..Config::default()
        })
    }
}

impl Config {
    /// Returns the bind address for the resolver.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
