//! Shared fakes and wiremock fixtures for the integration tests.
//!
//! Each test binary compiles this module separately and uses a different
//! subset of it.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tunefetch_core::download::{
    AudioStream, ContentFeeder, FeedRequest, MetadataWriter, PipelineSettings, PostProcessError,
    StreamError, TagSet, Transcoder,
};
use tunefetch_core::{
    AccountTier, AudioQuality, CatalogClient, DownloadPipeline, MetadataFetcher, RateGate,
    RetryPolicy, StaticTokenSession,
};
use wiremock::{MockServer, Request, ResponseTemplate};

/// Catalog client pointed at the mock server, retrying twice without delay.
pub fn catalog_client(server: &MockServer) -> CatalogClient {
    let session = StaticTokenSession::new("test-token", AccountTier::Premium).unwrap();
    CatalogClient::with_base_url(Arc::new(session), format!("{}/v1", server.uri()))
        .unwrap()
        .with_retry_policy(RetryPolicy::immediate(2))
}

/// Settings writing below `root` with no rate gate waits.
pub fn settings_in(root: &Path) -> PipelineSettings {
    PipelineSettings {
        output_root: root.join("music"),
        podcast_output_root: root.join("podcasts"),
        quality: AudioQuality::VeryHigh,
        ..PipelineSettings::default()
    }
}

/// Everything a pipeline test needs to inspect afterwards.
pub struct Harness {
    pub pipeline: DownloadPipeline,
    pub fetcher: MetadataFetcher,
    pub feeder: Arc<FakeFeeder>,
    pub transcoder: Arc<CopyTranscoder>,
    pub tagger: Arc<RecordingTagger>,
}

/// Builds a pipeline over the mock catalog with in-memory collaborators.
pub fn harness(server: &MockServer, settings: PipelineSettings, feeder: FakeFeeder) -> Harness {
    let fetcher = MetadataFetcher::new(catalog_client(server));
    let feeder = Arc::new(feeder);
    let transcoder = Arc::new(CopyTranscoder::default());
    let tagger = Arc::new(RecordingTagger::default());
    let pipeline = DownloadPipeline::new(
        Arc::new(fetcher.clone()),
        feeder.clone(),
        settings,
        Arc::new(RateGate::disabled()),
    )
    .with_transcoder(transcoder.clone())
    .with_metadata_writer(tagger.clone())
    .with_stream_retry(RetryPolicy::immediate(3));
    Harness {
        pipeline,
        fetcher,
        feeder,
        transcoder,
        tagger,
    }
}

/// Feeder serving a fixed payload, optionally breaking every stream mid-way.
pub struct FakeFeeder {
    payload: Vec<u8>,
    broken: bool,
    requests: Mutex<Vec<FeedRequest>>,
}

impl FakeFeeder {
    pub fn serving(payload: &[u8]) -> Self {
        Self {
            payload: payload.to_vec(),
            broken: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every stream yields a few bytes and then fails.
    pub fn broken() -> Self {
        Self {
            payload: b"partial".to_vec(),
            broken: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requested_ids(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.reference.id.clone())
            .collect()
    }
}

#[async_trait]
impl ContentFeeder for FakeFeeder {
    async fn open(&self, request: &FeedRequest) -> Result<AudioStream, StreamError> {
        self.requests.lock().unwrap().push(request.clone());
        let head = io::Cursor::new(self.payload.clone());
        if self.broken {
            Ok(AudioStream::from_reader(head.chain(BrokenReader), None))
        } else {
            let size = self.payload.len() as u64;
            Ok(AudioStream::from_reader(head, Some(size)))
        }
    }
}

struct BrokenReader;

impl AsyncRead for BrokenReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "feed interrupted",
        )))
    }
}

/// Transcoder that copies its input, or fails when built with `failing()`.
#[derive(Default)]
pub struct CopyTranscoder {
    fail: bool,
    calls: AtomicUsize,
}

impl CopyTranscoder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        _quality: AudioQuality,
    ) -> Result<(), PostProcessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            // Leave a half-written output behind like a crashed encoder would.
            tokio::fs::write(output, b"half").await.unwrap();
            return Err(PostProcessError::transcode("encoder crashed"));
        }
        tokio::fs::copy(input, output)
            .await
            .map_err(|e| PostProcessError::io(output, e))?;
        Ok(())
    }
}

/// Tagger remembering what it was asked to write.
#[derive(Default)]
pub struct RecordingTagger {
    pub tags: Mutex<Vec<(PathBuf, TagSet)>>,
    pub artwork: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl MetadataWriter for RecordingTagger {
    async fn write_tags(&self, path: &Path, tags: &TagSet) -> Result<(), PostProcessError> {
        self.tags
            .lock()
            .unwrap()
            .push((path.to_path_buf(), tags.clone()));
        Ok(())
    }

    async fn embed_artwork(&self, _path: &Path, image: Vec<u8>) -> Result<(), PostProcessError> {
        self.artwork.lock().unwrap().push(image);
        Ok(())
    }
}

/// Catalog JSON for a track.
pub fn track_json(id: &str, title: &str, disc: u32, number: u32) -> Value {
    json!({
        "id": id,
        "name": title,
        "artists": [{ "id": "artist-1", "name": "The Band" }],
        "album": {
            "id": "album-1",
            "name": "The Record",
            "release_date": "2004-05-01",
            "images": []
        },
        "disc_number": disc,
        "track_number": number,
        "is_playable": true
    })
}

/// Responder for `GET /v1/tracks` echoing the requested id.
pub fn echo_track(request: &Request) -> ResponseTemplate {
    let id = request
        .url
        .query_pairs()
        .find(|(key, _)| key == "ids")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();
    let title = format!("Song {id}");
    ResponseTemplate::new(200).set_body_json(json!({
        "tracks": [track_json(&id, &title, 1, 1)]
    }))
}

/// A page of playlist items.
pub fn item_page(ids: impl IntoIterator<Item = String>) -> Value {
    let items: Vec<Value> = ids
        .into_iter()
        .map(|id| json!({ "track": { "id": id, "name": format!("Song {id}") } }))
        .collect();
    json!({ "items": items })
}

/// Every file below `dir`, relative to it, sorted.
pub fn files_below(dir: &Path) -> Vec<String> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                let relative = path.strip_prefix(base).unwrap();
                out.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}
