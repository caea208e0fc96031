//! Chunked document upload.

use bytes::{Bytes, BytesMut};
use futures::future::try_join_all;
use tracing::{debug, info};

use crate::config::LedgerParams;
use crate::contract::CostModel;
use crate::error::{DidError, DidResult, ErrorCode};
use crate::models::{
    Address, AppCall, AppId, BoxName, Metadata, Method, OwnerKey, PageLayout, Transaction,
    METADATA_SIZE,
};

use super::StorageClient;

/// Splits one page segment into write groups.
///
/// Every write call references the page with all but one of its slots and
/// the owner's metadata with the last. A group whose writes cannot cover the
/// page and metadata I/O is topped up with `dummy` calls carrying more page
/// references. Groups must be submitted in order; the first creates the page.
pub fn plan_page_groups(
    params: &LedgerParams,
    sender: Address,
    app_id: AppId,
    owner: OwnerKey,
    page: u64,
    segment: &Bytes,
) -> DidResult<Vec<Vec<Transaction>>> {
    params.validate()?;
    let refs_per_call = params.max_references_per_call as u64;
    let required_refs = (segment.len() as u64 + METADATA_SIZE as u64)
        .div_ceil(params.io_bytes_per_reference);
    let calls_needed = required_refs.div_ceil(refs_per_call) as usize;
    if calls_needed > params.max_group_calls {
        return Err(DidError::with_message(
            ErrorCode::InvalidArgument,
            format!(
                "a page of {} bytes needs {} calls per group, limit is {}",
                segment.len(),
                calls_needed,
                params.max_group_calls
            ),
        ));
    }

    let chunk_size = params.bytes_per_call();
    let chunks: Vec<(u64, Bytes)> = if segment.is_empty() {
        vec![(0, Bytes::new())]
    } else {
        (0..segment.len())
            .step_by(chunk_size)
            .map(|offset| {
                let end = (offset + chunk_size).min(segment.len());
                (offset as u64, segment.slice(offset..end))
            })
            .collect()
    };

    let write_refs = std::iter::repeat(BoxName::Page(page))
        .take(params.max_references_per_call - 1)
        .chain(std::iter::once(BoxName::Metadata(owner)))
        .collect::<Vec<_>>();
    let dummy_refs = vec![BoxName::Page(page); params.max_references_per_call];

    let groups = chunks
        .chunks(params.max_group_calls)
        .map(|batch| {
            let mut group: Vec<Transaction> = batch
                .iter()
                .map(|(offset, data)| {
                    AppCall::new(
                        sender,
                        app_id,
                        Method::Write {
                            owner,
                            page,
                            offset: *offset,
                            data: data.clone(),
                        },
                    )
                    .with_boxes(write_refs.iter().copied())
                    .into()
                })
                .collect();
            while group.len() < calls_needed {
                group.push(
                    AppCall::new(sender, app_id, Method::Dummy)
                        .with_boxes(dummy_refs.iter().copied())
                        .into(),
                );
            }
            group
        })
        .collect();

    Ok(groups)
}

impl StorageClient {
    /// Uploads `document` for `owner` and marks it ready.
    ///
    /// Returns the metadata as read back right after allocation; its status
    /// is still `Uploading`.
    pub async fn upload_document(&self, owner: OwnerKey, document: Bytes) -> DidResult<Metadata> {
        let params = self.ledger.params().clone();
        params.validate()?;
        let cost_model = CostModel::new(&params);
        let layout = PageLayout::for_length(document.len() as u64, params.max_page_size);
        let cost = cost_model.layout_cost(&layout).ok_or_else(|| {
            DidError::with_message(ErrorCode::InvalidArgument, "document is too large to price")
        })?;

        info!(
            "Uploading {} bytes for {} over {} pages (cost {})",
            document.len(),
            owner,
            layout.num_pages,
            cost
        );

        let start_group = vec![
            Transaction::Payment {
                sender: self.sender,
                receiver: Address::for_application(self.app_id),
                amount: cost,
            },
            self.app_call(
                Method::StartUpload {
                    owner,
                    num_pages: layout.num_pages,
                    last_page_size: layout.last_page_size,
                },
                [BoxName::Metadata(owner)],
            ),
        ];
        self.submit("startUpload", start_group).await?;

        let metadata = self
            .ledger
            .metadata(self.app_id, &owner)
            .await?
            .ok_or_else(|| {
                DidError::with_message(
                    ErrorCode::MetadataNotFound,
                    format!("metadata for {} missing after startUpload", owner),
                )
            })?;

        let segments: Vec<(u64, Bytes)> = layout
            .segments(params.max_page_size)
            .enumerate()
            .map(|(i, range)| (metadata.start + i as u64, document.slice(range)))
            .collect();

        let uploads = segments.iter().map(|(page, segment)| {
            let params = &params;
            async move {
                let groups =
                    plan_page_groups(params, self.sender, self.app_id, owner, *page, segment)?;
                let total = groups.len();
                for (i, group) in groups.into_iter().enumerate() {
                    let label = format!("page {} group {}/{}", page, i + 1, total);
                    self.submit(&label, group).await?;
                }
                debug!("Page {} written ({} bytes)", page, segment.len());
                Ok::<_, DidError>(())
            }
        });
        try_join_all(uploads).await?;

        self.validate(&metadata, &document).await?;

        self.submit(
            "finishUpload",
            vec![self.app_call(Method::FinishUpload { owner }, [BoxName::Metadata(owner)])],
        )
        .await?;

        info!(
            "Uploaded document for {} into pages {}..={}",
            owner, metadata.start, metadata.end
        );
        Ok(metadata)
    }

    /// Reads every page back and compares the concatenation with `expected`.
    async fn validate(&self, metadata: &Metadata, expected: &Bytes) -> DidResult<()> {
        let reads = (metadata.start..=metadata.end).map(|page| self.ledger.page(self.app_id, page));
        let pages = try_join_all(reads).await?;

        let mut stored = BytesMut::with_capacity(expected.len());
        for (page, data) in (metadata.start..=metadata.end).zip(pages) {
            let data = data.ok_or_else(|| {
                DidError::with_message(
                    ErrorCode::ValidationFailed,
                    format!("page {} was never written", page),
                )
            })?;
            stored.extend_from_slice(&data);
        }

        if stored.as_ref() != expected.as_ref() {
            return Err(DidError::with_message(
                ErrorCode::ValidationFailed,
                format!(
                    "stored document ({} bytes) differs from the upload ({} bytes)",
                    stored.len(),
                    expected.len()
                ),
            ));
        }
        Ok(())
    }
}
