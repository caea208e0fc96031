//! Ordered document deletion and document updates.

use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use crate::error::{DidError, DidResult, ErrorCode};
use crate::models::{BoxName, Metadata, Method, OwnerKey, Status, Transaction};

use super::StorageClient;

/// How far an interrupted deletion has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeletionProgress {
    pub start: u64,
    pub end: u64,
    /// First page still present.
    pub next_page: u64,
    pub remaining: u64,
}

/// Summary of a completed deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub pages_deleted: u64,
    /// Reserve returned to the administrator.
    pub refunded: u64,
    pub fees: u64,
}

impl StorageClient {
    /// Deletes the document of `owner` page by page.
    ///
    /// A document already in `Deleting` is resumed where it stopped. When
    /// retries run out the record stays in `Deleting` and a later call picks
    /// up from the first page still present.
    pub async fn delete_document(&self, owner: OwnerKey) -> DidResult<DeletionReport> {
        self.ledger.params().validate()?;
        let metadata = self.require_metadata(&owner).await?;

        let mut report = DeletionReport::default();
        let first = match metadata.status {
            Status::Ready => {
                let receipt = self
                    .submit(
                        "startDelete",
                        vec![self.app_call(Method::StartDelete { owner }, [BoxName::Metadata(owner)])],
                    )
                    .await?;
                report.fees += receipt.fees;
                info!(
                    "Deleting document for {} (pages {}..={})",
                    owner, metadata.start, metadata.end
                );
                metadata.start
            }
            Status::Deleting => {
                let next = self.next_page(&metadata).await?;
                info!(
                    "Resuming deletion for {} at page {} of {}..={}",
                    owner, next, metadata.start, metadata.end
                );
                next
            }
            Status::Uploading => {
                return Err(DidError::with_message(
                    ErrorCode::InvalidStatus,
                    format!("document for {} is still uploading", owner),
                ))
            }
        };

        for page in first..=metadata.end {
            let receipt = self
                .submit(&format!("deleteData page {}", page), self.delete_group(owner, page))
                .await?;
            report.pages_deleted += 1;
            report.refunded += receipt.paid_to(&self.sender);
            report.fees += receipt.fees;
        }

        info!(
            "Deleted document for {}: {} pages, refunded {}",
            owner, report.pages_deleted, report.refunded
        );
        Ok(report)
    }

    /// Progress of an in-flight deletion, or `None` if `owner` has no
    /// document being deleted.
    pub async fn deletion_progress(&self, owner: OwnerKey) -> DidResult<Option<DeletionProgress>> {
        let metadata = match self.ledger.metadata(self.app_id, &owner).await? {
            Some(m) if m.status == Status::Deleting => m,
            _ => return Ok(None),
        };
        let next_page = self.next_page(&metadata).await?;
        Ok(Some(DeletionProgress {
            start: metadata.start,
            end: metadata.end,
            next_page,
            remaining: metadata.end - next_page + 1,
        }))
    }

    /// Replaces the document of `owner`: deletes it, then uploads
    /// `document` under a fresh page range.
    pub async fn update_document(&self, owner: OwnerKey, document: Bytes) -> DidResult<Metadata> {
        self.delete_document(owner).await?;
        self.upload_document(owner, document).await
    }

    async fn require_metadata(&self, owner: &OwnerKey) -> DidResult<Metadata> {
        self.ledger
            .metadata(self.app_id, owner)
            .await?
            .ok_or_else(|| {
                DidError::with_message(
                    ErrorCode::MetadataNotFound,
                    format!("no document stored for {}", owner),
                )
            })
    }

    /// First page of a `Deleting` document that has not been deleted yet.
    ///
    /// `last_deleted` is zero both before the first deletion and after
    /// deleting page zero, so the start page is checked directly.
    async fn next_page(&self, metadata: &Metadata) -> DidResult<u64> {
        if self.ledger.page(self.app_id, metadata.start).await?.is_some() {
            Ok(metadata.start)
        } else {
            Ok(metadata.last_deleted + 1)
        }
    }

    /// One `deleteData` call followed by reference-carrying no-ops.
    fn delete_group(&self, owner: OwnerKey, page: u64) -> Vec<Transaction> {
        let refs = self.ledger.params().max_references_per_call;
        let delete_refs = std::iter::once(BoxName::Metadata(owner))
            .chain(std::iter::repeat(BoxName::Page(page)).take(refs - 1));

        let mut group = vec![self.app_call(Method::DeletePage { owner, page }, delete_refs)];
        for _ in 0..self.config.delete_padding_calls {
            group.push(self.app_call(Method::Dummy, vec![BoxName::Page(page); refs]));
        }
        group
    }
}
