//! Identifier resolution across ledger networks.

use bytes::{Bytes, BytesMut};
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{DidError, DidResult, ErrorCode};
use crate::ledger::LedgerClient;
use crate::models::{DidIdentifier, Metadata, Status};

/// A resolved document together with the record it was read from.
#[derive(Debug, Clone)]
pub struct ResolvedDocument {
    pub identifier: DidIdentifier,
    pub metadata: Metadata,
    pub document: Bytes,
}

/// Resolves `did:algo` identifiers against a set of named networks.
#[derive(Clone, Default)]
pub struct Resolver {
    networks: BTreeMap<String, Arc<dyn LedgerClient>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the ledger serving `network`.
    pub fn with_network(mut self, network: impl Into<String>, ledger: Arc<dyn LedgerClient>) -> Self {
        self.networks.insert(network.into(), ledger);
        self
    }

    /// Names of the networks this resolver can reach.
    pub fn networks(&self) -> Vec<&str> {
        self.networks.keys().map(String::as_str).collect()
    }

    fn ledger(&self, network: &str) -> DidResult<&Arc<dyn LedgerClient>> {
        self.networks.get(network).ok_or_else(|| {
            DidError::with_message(
                ErrorCode::UnsupportedNetwork,
                format!("Unsupported network: {}", network),
            )
        })
    }

    /// Parses `did` and returns the stored document bytes.
    pub async fn resolve(&self, did: &str) -> DidResult<Bytes> {
        let identifier = DidIdentifier::parse(did)?;
        Ok(self.resolve_identifier(&identifier).await?.document)
    }

    pub async fn resolve_identifier(&self, identifier: &DidIdentifier) -> DidResult<ResolvedDocument> {
        let ledger = self.ledger(&identifier.network)?;

        let lookup = ledger.metadata(identifier.app_id, &identifier.owner).await;
        let metadata = match lookup {
            Ok(Some(metadata)) => metadata,
            Ok(None) => return Err(not_found(identifier, "no metadata box")),
            Err(e) if e.code == ErrorCode::ApplicationNotFound => {
                return Err(not_found(identifier, &e.message))
            }
            Err(e) => return Err(e),
        };

        match metadata.status {
            Status::Uploading => return Err(DidError::new(ErrorCode::DocumentUploading)),
            Status::Deleting => return Err(DidError::new(ErrorCode::DocumentDeleting)),
            Status::Ready => {}
        }

        let reads = (metadata.start..=metadata.end)
            .map(|page| ledger.page(identifier.app_id, page));
        let pages = try_join_all(reads).await?;

        let mut document = BytesMut::new();
        for (page, data) in (metadata.start..=metadata.end).zip(pages) {
            let data = data.ok_or_else(|| {
                DidError::with_message(
                    ErrorCode::Corrupted,
                    format!("page {} of a ready document is missing", page),
                )
            })?;
            document.extend_from_slice(&data);
        }

        debug!(
            "Resolved {} from pages {}..={} ({} bytes)",
            identifier,
            metadata.start,
            metadata.end,
            document.len()
        );

        Ok(ResolvedDocument {
            identifier: identifier.clone(),
            metadata,
            document: document.freeze(),
        })
    }
}

fn not_found(identifier: &DidIdentifier, cause: &str) -> DidError {
    DidError::with_message(
        ErrorCode::DocumentNotFound,
        format!(
            "Failed to get metadata from box. Ensure network ({}), app ID ({}), and pubkey ({}) are correct: {}",
            identifier.network,
            identifier.app_id,
            identifier.owner.to_hex(),
            cause
        ),
    )
}
