//! Per-item download pipeline.
//!
//! For one track or episode: look up metadata, derive the target path, skip
//! items that already exist or cannot be played, stream the audio under a
//! bounded retry budget, then transcode, tag and embed cover art before the
//! finished file is renamed onto its target path.
//!
//! The target path only ever holds a complete, post-processed file. While an
//! item is in flight its bytes live in `{target}.part`, `{target}.raw` and
//! `{stem}.staging.{ext}`.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use super::error::{DownloadError, PipelineError, PostProcessError, StreamError};
use super::feeder::{ContentFeeder, FeedRequest};
use super::filename::{item_file_name, part_path, raw_path, sanitize_component, staging_path};
use super::rate_gate::RateGate;
use super::retry::{DEFAULT_STREAM_RETRIES, FailureType, RetryDecision, RetryPolicy};
use super::tagging::{LoftyMetadataWriter, MetadataWriter, TagSet};
use super::transcode::{FfmpegTranscoder, Transcoder};
use crate::catalog::{CatalogError, MetadataSource, TrackMetadata};
use crate::parser::{MediaKind, MediaReference};
use crate::report::{Reporter, TracingReporter};
use crate::session::AudioQuality;

/// Default streaming chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 50_000;

/// Output settings of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Root directory for music.
    pub output_root: PathBuf,
    /// Root directory for podcast episodes.
    pub podcast_output_root: PathBuf,
    /// Skip items whose target already exists with nonzero size.
    pub skip_existing: bool,
    /// Output extension, which also selects the transcoder's container.
    pub output_format: String,
    /// Keep the stream as received; no transcode, tags or artwork.
    pub raw_passthrough: bool,
    /// Read size of each streaming chunk.
    pub chunk_size_bytes: usize,
    /// Audio quality tier requested from the feeder and used for the bitrate.
    pub quality: AudioQuality,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("downloads/music"),
            podcast_output_root: PathBuf::from("downloads/podcasts"),
            skip_existing: true,
            output_format: "mp3".to_string(),
            raw_passthrough: false,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            quality: AudioQuality::High,
        }
    }
}

/// One unit of work for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Track or episode to download, by the id the caller knows.
    pub reference: MediaReference,
    /// Directory below the output root (already sanitized components).
    pub output_dir: PathBuf,
    /// Position inside an album, rendered as `NN. ` in the file name.
    pub ordinal_prefix: Option<u32>,
    /// Streaming attempts made so far.
    pub attempt_count: u32,
}

impl DownloadTask {
    /// Creates a task writing directly under the output root.
    #[must_use]
    pub fn new(reference: MediaReference) -> Self {
        Self {
            reference,
            output_dir: PathBuf::new(),
            ordinal_prefix: None,
            attempt_count: 0,
        }
    }

    /// Places the output in `dir` below the root.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Adds an ordinal prefix to the file name.
    #[must_use]
    pub fn with_ordinal(mut self, ordinal: u32) -> Self {
        self.ordinal_prefix = Some(ordinal);
        self
    }
}

/// Why an item was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The catalog entry is missing or has no title.
    NotFound,
    /// A nonzero-size file already exists at the target path.
    AlreadyExists,
    /// The item cannot be streamed (licensing or region).
    Unavailable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "not found",
            Self::AlreadyExists => "already exists",
            Self::Unavailable => "unavailable",
        })
    }
}

/// Result of processing one task.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The item was written to `path`.
    Downloaded {
        /// Final file.
        path: PathBuf,
    },
    /// Nothing was written.
    Skipped(SkipReason),
    /// The item failed; other items are unaffected.
    Failed(DownloadError),
}

impl DownloadOutcome {
    /// Whether the item ended up on disk in this run.
    #[must_use]
    pub fn is_downloaded(&self) -> bool {
        matches!(self, Self::Downloaded { .. })
    }
}

/// Downloads single items.
pub struct DownloadPipeline {
    metadata: Arc<dyn MetadataSource>,
    feeder: Arc<dyn ContentFeeder>,
    transcoder: Arc<dyn Transcoder>,
    tagger: Arc<dyn MetadataWriter>,
    settings: PipelineSettings,
    stream_retry: RetryPolicy,
    rate_gate: Arc<RateGate>,
    reporter: Arc<dyn Reporter>,
    resolved: Mutex<HashMap<TargetKey, ResolvedTarget>>,
}

/// Everything of a task the target path depends on besides metadata.
type TargetKey = (MediaReference, PathBuf, Option<u32>);

#[derive(Debug, Clone)]
struct ResolvedTarget {
    path: PathBuf,
    label: String,
}

impl DownloadPipeline {
    /// Creates a pipeline with the ffmpeg transcoder and the lofty tag writer.
    pub fn new(
        metadata: Arc<dyn MetadataSource>,
        feeder: Arc<dyn ContentFeeder>,
        settings: PipelineSettings,
        rate_gate: Arc<RateGate>,
    ) -> Self {
        Self {
            metadata,
            feeder,
            transcoder: Arc::new(FfmpegTranscoder::default()),
            tagger: Arc::new(LoftyMetadataWriter),
            settings,
            stream_retry: RetryPolicy::with_max_attempts(DEFAULT_STREAM_RETRIES),
            rate_gate,
            reporter: Arc::new(TracingReporter),
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the transcoder.
    #[must_use]
    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = transcoder;
        self
    }

    /// Replaces the tag writer.
    #[must_use]
    pub fn with_metadata_writer(mut self, tagger: Arc<dyn MetadataWriter>) -> Self {
        self.tagger = tagger;
        self
    }

    /// Sets the streaming retry budget.
    #[must_use]
    pub fn with_stream_retry(mut self, policy: RetryPolicy) -> Self {
        self.stream_retry = policy;
        self
    }

    /// Sets the progress reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Output settings.
    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Rate gate shared with the orchestrator.
    #[must_use]
    pub fn rate_gate(&self) -> &Arc<RateGate> {
        &self.rate_gate
    }

    /// Processes one task to its final outcome.
    ///
    /// Per-item problems become [`DownloadOutcome::Skipped`] or
    /// [`DownloadOutcome::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Authorization`] when the catalog rejects the
    /// session, since every later item would fail the same way.
    #[instrument(skip(self, task), fields(item = %task.reference))]
    pub async fn process(&self, mut task: DownloadTask) -> Result<DownloadOutcome, PipelineError> {
        // A target resolved earlier in this run needs no catalog lookup to be skipped.
        if self.settings.skip_existing
            && let Some(known) = self.resolved_target(&task)
            && is_nonempty_file(&known.path).await
        {
            debug!(path = %known.path.display(), "target exists, skipping without lookup");
            let outcome = DownloadOutcome::Skipped(SkipReason::AlreadyExists);
            self.reporter.item_finished(&known.label, &outcome);
            return Ok(outcome);
        }

        let metadata = match self.fetch_metadata(&task.reference).await {
            Ok(metadata) => metadata,
            Err(error) if error.is_fatal() => {
                return Err(PipelineError::Authorization { source: error });
            }
            Err(error) if error.is_not_found() => {
                debug!(error = %error, "metadata unresolvable");
                let outcome = DownloadOutcome::Skipped(SkipReason::NotFound);
                self.reporter
                    .item_finished(&task.reference.to_string(), &outcome);
                return Ok(outcome);
            }
            Err(error) => {
                let outcome = DownloadOutcome::Failed(DownloadError::Metadata { source: error });
                self.reporter
                    .item_finished(&task.reference.to_string(), &outcome);
                return Ok(outcome);
            }
        };

        let label = metadata.label();
        let target = self.target_path(&task, &metadata);
        self.remember_target(&task, &target, &label);

        if self.settings.skip_existing && is_nonempty_file(&target).await {
            debug!(path = %target.display(), "target exists, skipping");
            let outcome = DownloadOutcome::Skipped(SkipReason::AlreadyExists);
            self.reporter.item_finished(&label, &outcome);
            return Ok(outcome);
        }

        if !metadata.is_playable {
            let outcome = DownloadOutcome::Skipped(SkipReason::Unavailable);
            self.reporter.item_finished(&label, &outcome);
            return Ok(outcome);
        }

        let outcome = match self.stream_with_retry(&mut task, &metadata, &target).await {
            Ok(()) => match self.finalize(&metadata, &target).await {
                Ok(()) => {
                    info!(path = %target.display(), attempts = task.attempt_count, "item downloaded");
                    DownloadOutcome::Downloaded { path: target }
                }
                Err(error) => DownloadOutcome::Failed(error),
            },
            Err(error) => DownloadOutcome::Failed(error),
        };
        self.reporter.item_finished(&label, &outcome);

        self.rate_gate.pause_after_item().await;
        Ok(outcome)
    }

    fn resolved_target(&self, task: &DownloadTask) -> Option<ResolvedTarget> {
        let resolved = self.resolved.lock().ok()?;
        resolved.get(&target_key(task)).cloned()
    }

    fn remember_target(&self, task: &DownloadTask, target: &Path, label: &str) {
        if let Ok(mut resolved) = self.resolved.lock() {
            resolved.insert(
                target_key(task),
                ResolvedTarget {
                    path: target.to_path_buf(),
                    label: label.to_string(),
                },
            );
        }
    }

    async fn fetch_metadata(&self, reference: &MediaReference) -> Result<TrackMetadata, CatalogError> {
        match reference.kind {
            MediaKind::Episode => self.metadata.episode(&reference.id).await,
            _ => self.metadata.track(&reference.id).await,
        }
    }

    /// Target path of an item: root, task directory, then the file name.
    ///
    /// Episodes without a task directory go into a folder named after the show.
    #[must_use]
    pub fn target_path(&self, task: &DownloadTask, metadata: &TrackMetadata) -> PathBuf {
        let file_name = item_file_name(
            metadata,
            task.ordinal_prefix,
            &self.settings.output_format,
        );
        let dir = if metadata.kind == MediaKind::Episode {
            let show_dir = if task.output_dir.as_os_str().is_empty() {
                PathBuf::from(sanitize_component(&metadata.album_name))
            } else {
                task.output_dir.clone()
            };
            self.settings.podcast_output_root.join(show_dir)
        } else {
            self.settings.output_root.join(&task.output_dir)
        };
        dir.join(file_name)
    }

    /// Streams into `{target}.part`, retrying whole attempts with backoff.
    ///
    /// The partial file is removed after every failed attempt.
    async fn stream_with_retry(
        &self,
        task: &mut DownloadTask,
        metadata: &TrackMetadata,
        target: &Path,
    ) -> Result<(), DownloadError> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }

        let part = part_path(target);
        let request = FeedRequest {
            reference: MediaReference::new(metadata.kind, metadata.canonical_id.clone()),
            quality: self.settings.quality,
        };
        if metadata.canonical_id != task.reference.id {
            debug!(
                requested = %task.reference.id,
                canonical = %metadata.canonical_id,
                "streaming canonical id"
            );
        }

        let mut attempt = 1;
        loop {
            task.attempt_count += 1;
            let label = metadata.label();
            let error = match self.stream_once(&request, &part, &label).await {
                Ok(bytes) => {
                    debug!(bytes, attempt, "stream complete");
                    return Ok(());
                }
                Err(error) => error,
            };

            if let Err(e) = tokio::fs::remove_file(&part).await
                && e.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = %part.display(), error = %e, "could not remove partial file");
            }

            match self.stream_retry.should_retry(FailureType::Transient, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "stream failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(reason = %reason, "stream retry budget exhausted");
                    return Err(DownloadError::StreamExhausted {
                        id: metadata.canonical_id.clone(),
                        attempts: attempt,
                        source: error,
                    });
                }
            }
        }
    }

    async fn stream_once(
        &self,
        request: &FeedRequest,
        part: &Path,
        label: &str,
    ) -> Result<u64, StreamError> {
        let mut stream = self.feeder.open(request).await?;
        let expected = stream.size_hint();
        self.reporter.item_started(label, expected);

        let file = File::create(part)
            .await
            .map_err(|e| StreamError::io(part, e))?;
        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0_u8; self.settings.chunk_size_bytes.max(1)];
        let mut received: u64 = 0;

        loop {
            let read = stream
                .reader()
                .read(&mut buffer)
                .await
                .map_err(|e| StreamError::io(part, e))?;
            if read == 0 {
                break;
            }
            writer
                .write_all(&buffer[..read])
                .await
                .map_err(|e| StreamError::io(part, e))?;
            received += read as u64;
            self.reporter.item_progress(received);
        }

        writer
            .flush()
            .await
            .map_err(|e| StreamError::io(part, e))?;
        stream.finish().await?;

        if let Some(expected) = expected
            && received < expected
        {
            return Err(StreamError::Truncated { expected, received });
        }
        if received == 0 {
            return Err(StreamError::feeder("feeder produced no audio"));
        }
        Ok(received)
    }

    /// Promotes the complete `.part` file to the target.
    async fn finalize(&self, metadata: &TrackMetadata, target: &Path) -> Result<(), DownloadError> {
        let part = part_path(target);
        if self.settings.raw_passthrough {
            return tokio::fs::rename(&part, target)
                .await
                .map_err(|e| DownloadError::io(target, e));
        }

        let raw = raw_path(target);
        tokio::fs::rename(&part, &raw)
            .await
            .map_err(|e| DownloadError::io(&raw, e))?;

        let staging = staging_path(target);
        if let Err(source) = self.post_process(metadata, &raw, &staging).await {
            if let Err(e) = tokio::fs::remove_file(&staging).await
                && e.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = %staging.display(), error = %e, "could not remove staging file");
            }
            warn!(raw = %raw.display(), error = %source, "post-processing failed, raw file kept");
            return Err(DownloadError::PostProcess {
                raw_path: raw,
                source,
            });
        }

        tokio::fs::rename(&staging, target)
            .await
            .map_err(|e| DownloadError::PostProcess {
                raw_path: raw.clone(),
                source: PostProcessError::io(target, e),
            })?;
        if let Err(e) = tokio::fs::remove_file(&raw).await {
            warn!(path = %raw.display(), error = %e, "could not remove raw file");
        }
        Ok(())
    }

    async fn post_process(
        &self,
        metadata: &TrackMetadata,
        raw: &Path,
        staging: &Path,
    ) -> Result<(), PostProcessError> {
        self.transcoder
            .transcode(raw, staging, self.settings.quality)
            .await?;
        self.tagger
            .write_tags(staging, &TagSet::from_metadata(metadata))
            .await?;

        if let Some(url) = &metadata.artwork_url {
            match self.metadata.artwork(url).await {
                Ok(image) => self.tagger.embed_artwork(staging, image).await?,
                Err(error) => {
                    warn!(url = %url, error = %error, "artwork unavailable");
                    self.reporter
                        .warning(&format!("no cover art for {}: {error}", metadata.label()));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for DownloadPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadPipeline")
            .field("settings", &self.settings)
            .field("stream_retry", &self.stream_retry)
            .field("rate_gate", &self.rate_gate)
            .finish_non_exhaustive()
    }
}

fn target_key(task: &DownloadTask) -> TargetKey {
    (
        task.reference.clone(),
        task.output_dir.clone(),
        task.ordinal_prefix,
    )
}

async fn is_nonempty_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file() && meta.len() > 0)
}
