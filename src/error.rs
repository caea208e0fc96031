//! Error codes and error response formatting.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hyper::ext::ReasonPhrase;
use thiserror::Error;

/// Error codes shared by the contract, the ledger, the orchestrators and the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Identifier errors
    InvalidIdentifier,
    InvalidScheme,
    InvalidMethod,
    InvalidNamespace,
    InvalidAppId,
    InvalidPublicKey,
    UnsupportedNetwork,

    // Contract state errors
    Unauthorized,
    MetadataExists,
    MetadataNotFound,
    InvalidStatus,
    PageOutOfRange,
    DeleteOrderViolation,
    PageNotFound,
    PageExists,
    WriteOutOfBounds,
    InvalidPayment,
    InvalidArgument,

    // Ledger limits
    ApplicationNotFound,
    EnvelopeTooLarge,
    TooManyReferences,
    GroupTooLarge,
    IoBudgetExceeded,
    MissingReference,
    InsufficientBalance,

    // Transient
    LedgerUnavailable,

    // Validation
    ValidationFailed,
    Corrupted,

    // Resolution
    DocumentNotFound,
    DocumentUploading,
    DocumentDeleting,
    UnsupportedRepresentation,
    InvalidDocument,
    Internal,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidIdentifier => "InvalidIdentifier",
            ErrorCode::InvalidScheme => "InvalidScheme",
            ErrorCode::InvalidMethod => "InvalidMethod",
            ErrorCode::InvalidNamespace => "InvalidNamespace",
            ErrorCode::InvalidAppId => "InvalidAppId",
            ErrorCode::InvalidPublicKey => "InvalidPublicKey",
            ErrorCode::UnsupportedNetwork => "UnsupportedNetwork",
            ErrorCode::Unauthorized => "Unauthorized",
            ErrorCode::MetadataExists => "MetadataExists",
            ErrorCode::MetadataNotFound => "MetadataNotFound",
            ErrorCode::InvalidStatus => "InvalidStatus",
            ErrorCode::PageOutOfRange => "PageOutOfRange",
            ErrorCode::DeleteOrderViolation => "DeleteOrderViolation",
            ErrorCode::PageNotFound => "PageNotFound",
            ErrorCode::PageExists => "PageExists",
            ErrorCode::WriteOutOfBounds => "WriteOutOfBounds",
            ErrorCode::InvalidPayment => "InvalidPayment",
            ErrorCode::InvalidArgument => "InvalidArgument",
            ErrorCode::ApplicationNotFound => "ApplicationNotFound",
            ErrorCode::EnvelopeTooLarge => "EnvelopeTooLarge",
            ErrorCode::TooManyReferences => "TooManyReferences",
            ErrorCode::GroupTooLarge => "GroupTooLarge",
            ErrorCode::IoBudgetExceeded => "IoBudgetExceeded",
            ErrorCode::MissingReference => "MissingReference",
            ErrorCode::InsufficientBalance => "InsufficientBalance",
            ErrorCode::LedgerUnavailable => "LedgerUnavailable",
            ErrorCode::ValidationFailed => "ValidationFailed",
            ErrorCode::Corrupted => "Corrupted",
            ErrorCode::DocumentNotFound => "DocumentNotFound",
            ErrorCode::DocumentUploading => "DocumentUploading",
            ErrorCode::DocumentDeleting => "DocumentDeleting",
            ErrorCode::UnsupportedRepresentation => "UnsupportedRepresentation",
            ErrorCode::InvalidDocument => "InvalidDocument",
            ErrorCode::Internal => "Internal",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            ErrorCode::InvalidIdentifier
            | ErrorCode::InvalidScheme
            | ErrorCode::InvalidMethod
            | ErrorCode::InvalidNamespace
            | ErrorCode::InvalidAppId
            | ErrorCode::InvalidPublicKey
            | ErrorCode::UnsupportedNetwork
            | ErrorCode::InvalidArgument
            | ErrorCode::DocumentUploading
            | ErrorCode::DocumentDeleting
            | ErrorCode::InvalidDocument => StatusCode::BAD_REQUEST,

            // 403 Forbidden
            ErrorCode::Unauthorized => StatusCode::FORBIDDEN,

            // 404 Not Found
            ErrorCode::DocumentNotFound
            | ErrorCode::MetadataNotFound
            | ErrorCode::PageNotFound
            | ErrorCode::ApplicationNotFound => StatusCode::NOT_FOUND,

            // 406 Not Acceptable
            ErrorCode::UnsupportedRepresentation => StatusCode::NOT_ACCEPTABLE,

            // 409 Conflict
            ErrorCode::MetadataExists
            | ErrorCode::InvalidStatus
            | ErrorCode::DeleteOrderViolation
            | ErrorCode::PageExists => StatusCode::CONFLICT,

            // 422 Unprocessable Entity
            ErrorCode::PageOutOfRange
            | ErrorCode::WriteOutOfBounds
            | ErrorCode::InvalidPayment
            | ErrorCode::EnvelopeTooLarge
            | ErrorCode::TooManyReferences
            | ErrorCode::GroupTooLarge
            | ErrorCode::IoBudgetExceeded
            | ErrorCode::MissingReference
            | ErrorCode::InsufficientBalance => StatusCode::UNPROCESSABLE_ENTITY,

            // 503 Service Unavailable
            ErrorCode::LedgerUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            ErrorCode::ValidationFailed | ErrorCode::Corrupted | ErrorCode::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Only the application creator may call this method.",
            ErrorCode::MetadataExists => "A document already exists for this public key.",
            ErrorCode::MetadataNotFound => "No document metadata exists for this public key.",
            ErrorCode::InvalidStatus => "The document is not in the required status.",
            ErrorCode::PageOutOfRange => "The page index is outside the document's page range.",
            ErrorCode::DeleteOrderViolation => "Pages must be deleted in ascending order.",
            ErrorCode::PageNotFound => "The specified page does not exist.",
            ErrorCode::WriteOutOfBounds => "The write exceeds the page capacity.",
            ErrorCode::InvalidPayment => "The storage payment does not match the required amount.",
            ErrorCode::ApplicationNotFound => "The specified application does not exist.",
            ErrorCode::LedgerUnavailable => "The ledger is temporarily unavailable.",
            ErrorCode::DocumentUploading => "DID document is still being uploaded",
            ErrorCode::DocumentDeleting => "DID document is being deleted",
            ErrorCode::Internal => "The server encountered an internal error.",
            _ => "An error occurred while processing the request.",
        }
    }
}

/// Error with code and message.
#[derive(Debug, Clone, Error)]
#[error("{code:?}: {message}")]
pub struct DidError {
    pub code: ErrorCode,
    pub message: String,
    pub request_id: Option<String>,
}

impl DidError {
    /// Creates a new error with the given code and default message.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.default_message().to_string(),
            code,
            request_id: None,
        }
    }

    /// Creates a new error with a custom message.
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            request_id: None,
        }
    }

    /// Sets the request ID for this error.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Whether resubmitting the same group may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self.code, ErrorCode::LedgerUnavailable)
    }
}

impl IntoResponse for DidError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let request_id = self
            .request_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut response = (
            status,
            [
                ("Content-Type", "text/plain; charset=utf-8".to_string()),
                ("x-request-id", request_id),
                ("x-error-code", self.code.as_str().to_string()),
            ],
            self.message.clone(),
        )
            .into_response();

        // Surface the message in the HTTP/1.1 status line as well
        if let Ok(reason) = ReasonPhrase::try_from(self.message.as_bytes()) {
            response.extensions_mut().insert(reason);
        }

        response
    }
}

/// Result type alias.
pub type DidResult<T> = Result<T, DidError>;
