//! Error types for the download module.
//!
//! Per-item failures ([`DownloadError`]) are contained by the pipeline and
//! surfaced as a failed outcome; [`PipelineError`] is reserved for conditions
//! that invalidate the whole session.

use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;

/// Failures while reading the decrypted audio stream of one item.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The content feeder could not be started or reported failure.
    #[error("content feeder failed: {reason}")]
    Feeder {
        /// Description of the failure.
        reason: String,
    },

    /// Reading the stream or writing the partial file failed.
    #[error("stream IO error at {path}: {source}")]
    Io {
        /// Partial file being written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The stream ended before the announced size was reached.
    #[error("stream truncated: expected {expected} bytes, got {received}")]
    Truncated {
        /// Announced size.
        expected: u64,
        /// Bytes received.
        received: u64,
    },
}

impl StreamError {
    /// Creates a feeder error.
    pub fn feeder(reason: impl Into<String>) -> Self {
        Self::Feeder {
            reason: reason.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures while converting or tagging a fully received raw file.
#[derive(Debug, Error)]
pub enum PostProcessError {
    /// The transcoder could not be started or exited unsuccessfully.
    #[error("transcoding failed: {reason}")]
    Transcode {
        /// Description of the failure (exit status, stderr excerpt).
        reason: String,
    },

    /// Tags could not be read or written.
    #[error("tagging {path} failed: {reason}")]
    Tagging {
        /// File being tagged.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// A filesystem operation of the finalization step failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl PostProcessError {
    /// Creates a transcode error.
    pub fn transcode(reason: impl Into<String>) -> Self {
        Self::Transcode {
            reason: reason.into(),
        }
    }

    /// Creates a tagging error.
    pub fn tagging(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Tagging {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Per-item download failure.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Metadata could not be retrieved.
    #[error("metadata lookup failed: {source}")]
    Metadata {
        /// The catalog error.
        #[source]
        source: CatalogError,
    },

    /// Every streaming attempt failed.
    #[error("stream for {id} failed after {attempts} attempts: {source}")]
    StreamExhausted {
        /// Canonical id that was streamed.
        id: String,
        /// Attempts made.
        attempts: u32,
        /// Error of the last attempt.
        #[source]
        source: StreamError,
    },

    /// Post-processing failed; the raw file is kept for inspection.
    #[error("post-processing failed (raw file kept at {raw_path}): {source}")]
    PostProcess {
        /// Retained raw file.
        raw_path: PathBuf,
        /// The underlying failure.
        #[source]
        source: PostProcessError,
    },

    /// Preparing the output location failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Conditions that abort every remaining item of a batch.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The session is no longer authorized; continuing would fail every item.
    #[error("session no longer authorized: {source}")]
    Authorization {
        /// The catalog error that revealed it.
        #[source]
        source: CatalogError,
    },
}
