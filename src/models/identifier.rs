//! `did:algo` identifiers.

use std::fmt;
use std::str::FromStr;

use crate::config::DEFAULT_NETWORK;
use crate::error::{DidError, DidResult, ErrorCode};

use super::address::{AppId, OwnerKey};

pub const DID_SCHEME: &str = "did";
pub const DID_METHOD: &str = "algo";
pub const APP_NAMESPACE: &str = "app";

/// A parsed identifier of the form `did:algo:[<network>:]app:<appId>:<ownerKeyHex>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DidIdentifier {
    pub network: String,
    pub app_id: AppId,
    pub owner: OwnerKey,
}

impl DidIdentifier {
    pub fn new(network: impl Into<String>, app_id: AppId, owner: OwnerKey) -> Self {
        Self {
            network: network.into(),
            app_id,
            owner,
        }
    }

    pub fn parse(s: &str) -> DidResult<Self> {
        let segments: Vec<&str> = s.split(':').collect();

        let scheme = segments.first().copied().unwrap_or_default();
        if scheme != DID_SCHEME {
            return Err(DidError::with_message(
                ErrorCode::InvalidScheme,
                format!("invalid protocol, expected '{}', got {}", DID_SCHEME, scheme),
            ));
        }
        let method = segments.get(1).copied().unwrap_or_default();
        if method != DID_METHOD {
            return Err(DidError::with_message(
                ErrorCode::InvalidMethod,
                format!("invalid DID method, expected '{}', got {}", DID_METHOD, method),
            ));
        }

        // Without a network segment every later index shifts down by one
        let (network, offset) = match segments.len() {
            6 => (segments[2], 0),
            5 => (DEFAULT_NETWORK, 1),
            n => {
                return Err(DidError::with_message(
                    ErrorCode::InvalidIdentifier,
                    format!("invalid identifier, expected 5 or 6 segments, got {}", n),
                ))
            }
        };

        let namespace = segments[3 - offset];
        if namespace != APP_NAMESPACE {
            return Err(DidError::with_message(
                ErrorCode::InvalidNamespace,
                format!("invalid namespace, expected '{}', got {}", APP_NAMESPACE, namespace),
            ));
        }

        let app_segment = segments[4 - offset];
        let app_id: AppId = app_segment.parse().map_err(|_| {
            DidError::with_message(
                ErrorCode::InvalidAppId,
                format!("invalid app ID, expected uint64, got {}", app_segment),
            )
        })?;

        let owner = OwnerKey::from_hex(segments[5 - offset])?;

        Ok(Self {
            network: network.to_string(),
            app_id,
            owner,
        })
    }
}

impl FromStr for DidIdentifier {
    type Err = DidError;

    fn from_str(s: &str) -> DidResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DidIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}:{}",
            DID_SCHEME, DID_METHOD, self.network, APP_NAMESPACE, self.app_id, self.owner
        )
    }
}
