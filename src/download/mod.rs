//! Download pipeline for individual tracks and episodes.
//!
//! This module turns one [`DownloadTask`] into a file on disk: metadata
//! lookup, skip-existing check, streaming from the content feeder with a
//! bounded retry budget, transcoding, tagging and artwork embedding. It also
//! holds the [`RateGate`] that spaces items out and the [`RetryPolicy`]
//! shared with the catalog client.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tunefetch_core::catalog::{CatalogClient, MetadataFetcher};
//! use tunefetch_core::download::{
//!     CommandContentFeeder, DownloadPipeline, DownloadTask, PipelineSettings, RateGate,
//! };
//! use tunefetch_core::parser::{MediaKind, MediaReference};
//! use tunefetch_core::session::{AccountTier, StaticTokenSession};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Arc::new(StaticTokenSession::new("token", AccountTier::Free)?);
//! let fetcher = MetadataFetcher::new(CatalogClient::new(session)?);
//! let pipeline = DownloadPipeline::new(
//!     Arc::new(fetcher),
//!     Arc::new(CommandContentFeeder::from_command_line("feeder")?),
//!     PipelineSettings::default(),
//!     Arc::new(RateGate::disabled()),
//! );
//! let task = DownloadTask::new(MediaReference::new(MediaKind::Track, "4uLU6hMCjMI75M1A2tKUQC"));
//! let outcome = pipeline.process(task).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub(crate) mod constants;
mod error;
mod feeder;
pub mod filename;
mod pipeline;
mod rate_gate;
mod retry;
mod tagging;
mod transcode;

pub use error::{DownloadError, PipelineError, PostProcessError, StreamError};
pub use feeder::{AudioStream, CommandContentFeeder, ContentFeeder, FeedRequest};
pub use pipeline::{
    DEFAULT_CHUNK_SIZE, DownloadOutcome, DownloadPipeline, DownloadTask, PipelineSettings,
    SkipReason,
};
pub use rate_gate::{RateGate, parse_retry_after};
pub use retry::{
    DEFAULT_STREAM_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_http_status,
};
pub use tagging::{LoftyMetadataWriter, MetadataWriter, TagSet};
pub use transcode::{FfmpegTranscoder, Transcoder};
