//! Tunefetch Core Library
//!
//! This library provides the core functionality for the tunefetch tool,
//! which resolves catalog links, URIs and free-text searches into media
//! references and materializes each referenced track or episode as a tagged
//! audio file on disk.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`catalog`] - Catalog HTTP client, paginated traversal and metadata DTOs
//! - [`parser`] - Input recognition (URIs, web links) and selection parsing
//! - [`search`] - Multi-type search with a flattened selection index
//! - [`download`] - Per-item download pipeline, rate gate and retry policy
//! - [`orchestrator`] - Album, artist, playlist and library batches
//! - [`report`] - Reporting interface separating core logic from presentation
//! - [`config`] - Environment-derived configuration
//! - [`session`] - Authenticated session seam

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod config;
pub mod download;
pub mod orchestrator;
pub mod parser;
pub mod report;
pub mod search;
pub mod session;
mod user_agent;

// Re-export commonly used types
pub use catalog::{CatalogClient, CatalogError, CollectionPaginator, MetadataFetcher};
pub use config::{AppConfig, ConfigError};
pub use download::{
    DEFAULT_STREAM_RETRIES, DownloadOutcome, DownloadPipeline, DownloadTask, FailureType,
    RateGate, RetryDecision, RetryPolicy, SkipReason,
};
pub use orchestrator::{ArtistScope, BatchOrchestrator, BatchReport, OrchestratorError};
pub use parser::{MediaKind, MediaReference, SelectionError, parse_selection, resolve_input};
pub use report::{BatchKind, Reporter, TracingReporter};
pub use search::{FlattenedSearchIndex, SearchIndexer, SearchSelection};
pub use session::{AccountTier, AudioQuality, AuthenticatedSession, StaticTokenSession};
