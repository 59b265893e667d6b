//! Environment-derived configuration.
//!
//! Every key is read from a `TUNEFETCH_`-prefixed environment variable
//! (`TUNEFETCH_OUTPUT_ROOT`, `TUNEFETCH_SKIP_EXISTING`, ...). The binary loads a
//! `.env` file first when one is present. Components never read the
//! environment themselves; they receive the pieces they need from
//! [`AppConfig`] at construction time.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::download::{PipelineSettings, RateGate, RetryPolicy};
use crate::session::{AccountTier, AudioQuality};

/// Prefix shared by every configuration variable.
pub const ENV_PREFIX: &str = "TUNEFETCH_";

/// Largest per-type result cap the catalog search endpoint accepts.
const MAX_SEARCH_RESULT_LIMIT: u32 = 50;

fn default_output_root() -> PathBuf {
    PathBuf::from("downloads/music")
}

fn default_podcast_output_root() -> PathBuf {
    PathBuf::from("downloads/podcasts")
}

fn default_true() -> bool {
    true
}

fn default_output_format() -> String {
    "mp3".to_string()
}

fn default_inter_item_wait_seconds() -> u64 {
    5
}

fn default_inter_album_wait_seconds() -> u64 {
    30
}

fn default_chunk_size_bytes() -> usize {
    50_000
}

fn default_search_result_limit() -> u32 {
    MAX_SEARCH_RESULT_LIMIT
}

fn default_http_retry_count() -> u32 {
    10
}

fn default_stream_retry_count() -> u32 {
    crate::download::DEFAULT_STREAM_RETRIES
}

fn default_catalog_base_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_market() -> String {
    "from_token".to_string()
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_read_timeout_secs() -> u64 {
    30
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was present but could not be parsed.
    #[error("invalid environment configuration: {source}")]
    Env {
        /// The underlying envy error.
        #[source]
        source: envy::Error,
    },

    /// A value parsed but is outside the accepted range.
    #[error("invalid value for TUNEFETCH_{key}: {reason}")]
    Invalid {
        /// Unprefixed, lowercase key name.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Full runtime configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Destination directory for music.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    /// Destination directory for podcast episodes.
    #[serde(default = "default_podcast_output_root")]
    pub podcast_output_root: PathBuf,
    /// Skip items whose target file already exists with nonzero size.
    #[serde(default = "default_true")]
    pub skip_existing: bool,
    /// Output container/codec extension (`mp3`, `ogg`, ...).
    #[serde(default = "default_output_format")]
    pub output_format: String,
    /// Request the highest quality tier regardless of account type.
    #[serde(default)]
    pub force_premium_tier: bool,
    /// Keep the streamed audio as-is (no transcode, tags or artwork).
    #[serde(default)]
    pub raw_passthrough: bool,
    /// Wait after each downloaded item.
    #[serde(default = "default_inter_item_wait_seconds")]
    pub inter_item_wait_seconds: u64,
    /// Wait between albums of a discography.
    #[serde(default = "default_inter_album_wait_seconds")]
    pub inter_album_wait_seconds: u64,
    /// Disable every rate gate wait.
    #[serde(default)]
    pub override_auto_wait: bool,
    /// Read size used while streaming audio to disk.
    #[serde(default = "default_chunk_size_bytes")]
    pub chunk_size_bytes: usize,
    /// Per-type result cap for searches.
    #[serde(default = "default_search_result_limit")]
    pub search_result_limit: u32,
    /// Attempts for each catalog request (including the first).
    #[serde(default = "default_http_retry_count")]
    pub http_retry_count: u32,
    /// Attempts for each audio stream (including the first).
    #[serde(default = "default_stream_retry_count")]
    pub stream_retry_count: u32,
    /// Catalog API base URL.
    #[serde(default = "default_catalog_base_url")]
    pub catalog_base_url: String,
    /// Market used for track relinking.
    #[serde(default = "default_market")]
    pub market: String,
    /// Bearer token for catalog requests.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Declared account tier.
    #[serde(default)]
    pub account_type: AccountTier,
    /// External content feeder command line.
    #[serde(default)]
    pub content_feeder_command: Option<String>,
    /// Path to the ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    /// HTTP connect timeout.
    #[serde(default = "default_connect_timeout_secs")]
    pub http_connect_timeout_secs: u64,
    /// HTTP read timeout.
    #[serde(default = "default_read_timeout_secs")]
    pub http_read_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            podcast_output_root: default_podcast_output_root(),
            skip_existing: true,
            output_format: default_output_format(),
            force_premium_tier: false,
            raw_passthrough: false,
            inter_item_wait_seconds: default_inter_item_wait_seconds(),
            inter_album_wait_seconds: default_inter_album_wait_seconds(),
            override_auto_wait: false,
            chunk_size_bytes: default_chunk_size_bytes(),
            search_result_limit: default_search_result_limit(),
            http_retry_count: default_http_retry_count(),
            stream_retry_count: default_stream_retry_count(),
            catalog_base_url: default_catalog_base_url(),
            market: default_market(),
            access_token: None,
            account_type: AccountTier::Free,
            content_feeder_command: None,
            ffmpeg_path: default_ffmpeg_path(),
            http_connect_timeout_secs: default_connect_timeout_secs(),
            http_read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Loads and validates configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = envy::prefixed(ENV_PREFIX)
            .from_env::<Self>()
            .map_err(|source| ConfigError::Env { source })?;
        config.validate()?;
        debug!(?config.output_root, format = %config.output_format, "configuration loaded");
        Ok(config)
    }

    /// Loads and validates configuration from explicit `(name, value)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value cannot be parsed or fails validation.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::prefixed(ENV_PREFIX)
            .from_iter::<_, Self>(pairs)
            .map_err(|source| ConfigError::Env { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let format = self.output_format.trim();
        if format.is_empty() {
            return Err(ConfigError::invalid("output_format", "must not be empty"));
        }
        if format.contains(['/', '\\', '.']) {
            return Err(ConfigError::invalid(
                "output_format",
                format!("'{format}' must be a bare extension such as mp3"),
            ));
        }
        if self.chunk_size_bytes == 0 {
            return Err(ConfigError::invalid("chunk_size_bytes", "must be at least 1"));
        }
        if !(1..=MAX_SEARCH_RESULT_LIMIT).contains(&self.search_result_limit) {
            return Err(ConfigError::invalid(
                "search_result_limit",
                format!("must be between 1 and {MAX_SEARCH_RESULT_LIMIT}"),
            ));
        }
        if self.http_retry_count == 0 {
            return Err(ConfigError::invalid("http_retry_count", "must be at least 1"));
        }
        if self.stream_retry_count == 0 {
            return Err(ConfigError::invalid(
                "stream_retry_count",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Quality tier implied by the declared account type and the force flag.
    #[must_use]
    pub fn audio_quality(&self) -> AudioQuality {
        AudioQuality::for_tier(self.account_type, self.force_premium_tier)
    }

    /// Rate gate honoring the wait intervals and the override flag.
    #[must_use]
    pub fn rate_gate(&self) -> RateGate {
        if self.override_auto_wait {
            RateGate::disabled()
        } else {
            RateGate::new(
                Duration::from_secs(self.inter_item_wait_seconds),
                Duration::from_secs(self.inter_album_wait_seconds),
            )
        }
    }

    /// Retry policy for catalog requests.
    #[must_use]
    pub fn catalog_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.http_retry_count)
    }

    /// Retry policy for audio streaming attempts.
    #[must_use]
    pub fn stream_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.stream_retry_count)
    }

    /// Settings consumed by the download pipeline.
    #[must_use]
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            output_root: self.output_root.clone(),
            podcast_output_root: self.podcast_output_root.clone(),
            skip_existing: self.skip_existing,
            output_format: self.output_format.trim().to_string(),
            raw_passthrough: self.raw_passthrough,
            chunk_size_bytes: self.chunk_size_bytes,
            quality: self.audio_quality(),
        }
    }
}
