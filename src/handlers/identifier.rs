//! `GET /1.0/identifiers/:identifier`.

use axum::body::Body;
use bytes::Bytes;
use axum::http::{header, HeaderValue, Response, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{DidError, DidResult, ErrorCode};
use crate::models::DidIdentifier;
use crate::resolver::{ResolvedDocument, Resolver};

use super::{build_response, common_headers};

/// Media type used when the client sends no Accept header.
pub const DEFAULT_CONTENT_TYPE: &str = "application/did";

/// Media types answered with the stored document itself.
pub const RAW_CONTENT_TYPES: [&str; 5] = [
    "application/did",
    "application/did+json",
    "application/did+ld+json",
    "application/ld+json",
    "application/json",
];

/// Media type answered with a resolution result envelope.
pub const RESOLUTION_CONTENT_TYPE: &str = "application/did-resolution";

/// How a resolved document is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// The document as stored, under the given media type.
    Document(&'static str),
    /// Document plus resolution and document metadata.
    Resolution,
}

impl Representation {
    /// Picks the first supported media type from an Accept header.
    pub fn negotiate(accept: Option<&str>) -> DidResult<Self> {
        let accept = match accept.map(str::trim) {
            None | Some("") => return Ok(Self::Document(DEFAULT_CONTENT_TYPE)),
            Some(accept) => accept,
        };

        for range in accept.split(',') {
            let media = range.split(';').next().unwrap_or("").trim();
            if media == "*/*" || media == "application/*" {
                return Ok(Self::Document(DEFAULT_CONTENT_TYPE));
            }
            if media == RESOLUTION_CONTENT_TYPE {
                return Ok(Self::Resolution);
            }
            if let Some(raw) = RAW_CONTENT_TYPES.iter().find(|t| **t == media) {
                return Ok(Self::Document(*raw));
            }
        }

        let supported: Vec<&str> = RAW_CONTENT_TYPES
            .iter()
            .copied()
            .chain(std::iter::once(RESOLUTION_CONTENT_TYPE))
            .collect();
        Err(DidError::with_message(
            ErrorCode::UnsupportedRepresentation,
            format!(
                "Unsupported content type: {}. Supported types: {}",
                accept,
                supported.join(", ")
            ),
        ))
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Document(media) => *media,
            Self::Resolution => RESOLUTION_CONTENT_TYPE,
        }
    }
}

/// Resolves `identifier` and renders it for the requested representation.
pub async fn resolve_identifier(
    resolver: &Resolver,
    identifier: &str,
    accept: Option<&str>,
    request_id: &str,
) -> DidResult<Response<Body>> {
    let did: DidIdentifier = identifier.parse()?;
    let resolved = resolver.resolve_identifier(&did).await?;
    let representation = Representation::negotiate(accept)?;

    let document: Value = serde_json::from_slice(&resolved.document).map_err(|e| {
        DidError::with_message(ErrorCode::InvalidDocument, format!("Invalid JSON: {}", e))
    })?;

    // Raw representations serve the stored bytes so key order survives
    let body = match representation {
        Representation::Document(_) => resolved.document.clone(),
        Representation::Resolution => serde_json::to_vec(&resolution_result(&resolved, document))
            .map(Bytes::from)
            .map_err(|e| DidError::with_message(ErrorCode::Internal, e.to_string()))?,
    };

    debug!(
        "Serving {} as {} ({} bytes)",
        resolved.identifier,
        representation.content_type(),
        body.len()
    );

    let mut headers = common_headers(request_id);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(representation.content_type()),
    );
    build_response(StatusCode::OK, headers, Body::from(body))
}

fn resolution_result(resolved: &ResolvedDocument, document: Value) -> Value {
    json!({
        "@context": "https://w3id.org/did-resolution/v1",
        "didDocument": document,
        "didResolutionMetadata": {
            "contentType": DEFAULT_CONTENT_TYPE,
            "did": {
                "didString": resolved.identifier.to_string(),
                "method": "algo",
                "network": resolved.identifier.network,
            },
        },
        "didDocumentMetadata": {
            "appId": resolved.identifier.app_id,
            "pages": {
                "start": resolved.metadata.start,
                "end": resolved.metadata.end,
            },
            "size": resolved.document.len(),
        },
    })
}
