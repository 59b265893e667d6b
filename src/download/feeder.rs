//! Access to decrypted audio through an external content feeder.
//!
//! The feeder is the component holding the streaming session; this crate
//! only asks it for the bytes of one item. [`CommandContentFeeder`] runs a
//! configured program that writes the audio to its stdout.

use std::fmt;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tracing::{debug, instrument};

use super::error::StreamError;
use crate::parser::MediaReference;
use crate::session::AudioQuality;

/// One stream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    /// Item to stream, identified by its canonical id.
    pub reference: MediaReference,
    /// Requested audio quality tier.
    pub quality: AudioQuality,
}

/// An open audio stream.
pub struct AudioStream {
    size_hint: Option<u64>,
    reader: Box<dyn AsyncRead + Send + Unpin>,
    process: Option<Child>,
}

impl AudioStream {
    /// Wraps an in-process reader.
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static, size_hint: Option<u64>) -> Self {
        Self {
            size_hint,
            reader: Box::new(reader),
            process: None,
        }
    }

    /// Expected total size, when the feeder announces one.
    #[must_use]
    pub fn size_hint(&self) -> Option<u64> {
        self.size_hint
    }

    /// Reader over the audio bytes.
    pub fn reader(&mut self) -> &mut (dyn AsyncRead + Send + Unpin) {
        self.reader.as_mut()
    }

    /// Completes the stream, checking the feeder process exit status.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Feeder`] if the feeder process failed.
    pub async fn finish(self) -> Result<(), StreamError> {
        drop(self.reader);
        let Some(mut child) = self.process else {
            return Ok(());
        };
        let status = child
            .wait()
            .await
            .map_err(|e| StreamError::feeder(format!("waiting for feeder: {e}")))?;
        if status.success() {
            Ok(())
        } else {
            Err(StreamError::feeder(format!("feeder exited with {status}")))
        }
    }
}

impl fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioStream")
            .field("size_hint", &self.size_hint)
            .field("process", &self.process.as_ref().and_then(Child::id))
            .finish_non_exhaustive()
    }
}

/// Source of decrypted audio.
#[async_trait]
pub trait ContentFeeder: Send + Sync {
    /// Opens the stream of one item.
    async fn open(&self, request: &FeedRequest) -> Result<AudioStream, StreamError>;
}

/// Feeder that spawns an external program per item.
///
/// The program is invoked as `{program} {args...} {uri} {quality}` and must
/// write the audio to stdout and exit with status 0.
#[derive(Debug, Clone)]
pub struct CommandContentFeeder {
    program: String,
    args: Vec<String>,
}

impl CommandContentFeeder {
    /// Creates a feeder running `program` with leading `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parses a whitespace-separated command line.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Feeder`] for an empty command line.
    pub fn from_command_line(command_line: &str) -> Result<Self, StreamError> {
        let mut parts = command_line.split_whitespace().map(ToString::to_string);
        let program = parts
            .next()
            .ok_or_else(|| StreamError::feeder("empty content feeder command"))?;
        Ok(Self::new(program, parts.collect()))
    }
}

#[async_trait]
impl ContentFeeder for CommandContentFeeder {
    #[instrument(skip(self), fields(program = %self.program))]
    async fn open(&self, request: &FeedRequest) -> Result<AudioStream, StreamError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(request.reference.uri())
            .arg(request.quality.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| StreamError::feeder(format!("cannot start {}: {e}", self.program)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StreamError::feeder("feeder stdout unavailable"))?;
        debug!(pid = child.id(), "content feeder started");

        Ok(AudioStream {
            size_hint: None,
            reader: Box::new(stdout),
            process: Some(child),
        })
    }
}
