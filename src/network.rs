//! The in-process network served by the resolver binary.

use bytes::Bytes;
use std::sync::Arc;
use tracing::info;

use crate::config::{Config, SeedDocument, LOCAL_NETWORK};
use crate::error::{DidError, DidResult, ErrorCode};
use crate::ledger::{LedgerClient, MemoryLedger};
use crate::models::{Address, AppId, DidIdentifier, OwnerKey};
use crate::orchestrator::StorageClient;

/// Balance granted to the administrator of a fresh local network.
pub const ADMIN_FUNDING: u64 = 1_000_000_000_000;

/// A [`MemoryLedger`] with one deployed storage application.
pub struct LocalNetwork {
    pub ledger: Arc<MemoryLedger>,
    pub admin: Address,
    pub app_id: AppId,
    pub client: StorageClient,
}

impl LocalNetwork {
    /// Creates the ledger, funds the administrator and deploys the storage
    /// application with its account minimum balance.
    pub fn deploy(config: &Config) -> DidResult<Self> {
        config.ledger.validate()?;

        let ledger = Arc::new(MemoryLedger::new(config.ledger.clone()));
        let admin = Address::from_name("admin");
        ledger.fund(admin, ADMIN_FUNDING);

        let app_id = ledger.create_application(admin);
        ledger.fund(
            Address::for_application(app_id),
            config.ledger.account_min_balance,
        );

        let client = StorageClient::new(
            ledger.clone() as Arc<dyn LedgerClient>,
            app_id,
            admin,
            config.transfer.clone(),
        );

        info!("Deployed storage application {} on the {} network", app_id, LOCAL_NETWORK);
        Ok(Self {
            ledger,
            admin,
            app_id,
            client,
        })
    }

    /// Identifier of `owner`'s document on this network.
    pub fn identifier(&self, owner: OwnerKey) -> DidIdentifier {
        DidIdentifier::new(LOCAL_NETWORK, self.app_id, owner)
    }

    /// Uploads every seed document and returns their identifiers.
    pub async fn seed(&self, seeds: &[SeedDocument]) -> DidResult<Vec<DidIdentifier>> {
        let mut identifiers = Vec::with_capacity(seeds.len());
        for seed in seeds {
            let document = tokio::fs::read(&seed.path).await.map_err(|e| {
                DidError::with_message(
                    ErrorCode::InvalidArgument,
                    format!("cannot read seed document {}: {}", seed.path.display(), e),
                )
            })?;
            self.client
                .upload_document(seed.owner, Bytes::from(document))
                .await?;

            let identifier = self.identifier(seed.owner);
            info!("Seeded {} from {}", identifier, seed.path.display());
            identifiers.push(identifier);
        }
        Ok(identifiers)
    }
}
