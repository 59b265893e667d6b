//! Error types for catalog requests and traversals.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::download::{FailureType, classify_http_status, parse_retry_after};
use crate::session::SessionError;

/// Errors that can occur while talking to the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog entry does not exist or has no usable title.
    #[error("{resource} not found")]
    NotFound {
        /// What was looked up (`track 4uLU6h...`).
        resource: String,
    },

    /// The token was rejected.
    #[error("[AUTH] catalog rejected the session token (HTTP 401) for {url}\n  Suggestion: refresh TUNEFETCH_ACCESS_TOKEN")]
    Unauthorized {
        /// The URL that was refused.
        url: String,
    },

    /// The token lacks a permission the request needs.
    #[error("[AUTH] insufficient scope (HTTP 403) for {url}\n  Suggestion: obtain a token with library and playlist read scopes")]
    InsufficientScope {
        /// The URL that was refused.
        url: String,
    },

    /// The session could not provide a token.
    #[error("session error: {source}")]
    Session {
        /// The underlying session error.
        #[source]
        source: SessionError,
    },

    /// HTTP error response not covered by a more specific variant.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The Retry-After header value, if present.
        retry_after: Option<String>,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL being requested.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The response body did not match the expected shape.
    #[error("unexpected response from {url}: {source}")]
    Decode {
        /// The URL whose body failed to decode.
        url: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A page request failed part-way through a paginated traversal.
    ///
    /// The collection is incomplete; `items_yielded` items were handed out
    /// before the failure.
    #[error("pagination of {endpoint} aborted at offset {offset} after {items_yielded} items: {source}")]
    PaginationAborted {
        /// Endpoint being traversed.
        endpoint: String,
        /// Offset of the failed page.
        offset: u32,
        /// Items yielded before the failure.
        items_yielded: usize,
        /// The failure that aborted the traversal.
        #[source]
        source: Arc<CatalogError>,
    },
}

impl CatalogError {
    /// Creates a `NotFound` error for a kind and id.
    pub fn not_found(kind: impl std::fmt::Display, id: &str) -> Self {
        Self::NotFound {
            resource: format!("{kind} {id}"),
        }
    }

    /// Creates a network error, promoting timeouts to [`CatalogError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an error for a non-success status.
    pub fn from_status(url: impl Into<String>, status: u16, retry_after: Option<String>) -> Self {
        let url = url.into();
        match status {
            401 => Self::Unauthorized { url },
            403 => Self::InsufficientScope { url },
            _ => Self::HttpStatus {
                url,
                status,
                retry_after,
            },
        }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Whether the error means the item does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::HttpStatus { status: 404, .. }
        )
    }

    /// Whether the error must terminate the whole batch.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Unauthorized { .. } | Self::InsufficientScope { .. } | Self::Session { .. } => {
                true
            }
            Self::PaginationAborted { source, .. } => source.is_fatal(),
            _ => false,
        }
    }

    /// Server-requested delay before the next attempt, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::HttpStatus {
                retry_after: Some(value),
                ..
            } => parse_retry_after(value),
            _ => None,
        }
    }

    /// Classifies the error for retry decisions.
    ///
    /// | Error | Type |
    /// |-------|------|
    /// | HttpStatus | by status code |
    /// | Timeout, Network | Transient |
    /// | Unauthorized, InsufficientScope, Session | NeedsAuth |
    /// | NotFound, Decode, PaginationAborted | Permanent |
    #[must_use]
    pub fn failure_type(&self) -> FailureType {
        match self {
            Self::HttpStatus { status, .. } => classify_http_status(*status),
            Self::Timeout { .. } | Self::Network { .. } => FailureType::Transient,
            Self::Unauthorized { .. } | Self::InsufficientScope { .. } | Self::Session { .. } => {
                FailureType::NeedsAuth
            }
            Self::NotFound { .. } | Self::Decode { .. } | Self::PaginationAborted { .. } => {
                FailureType::Permanent
            }
        }
    }
}
