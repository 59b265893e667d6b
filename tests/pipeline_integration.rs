//! Integration tests for the per-item download pipeline.

#![allow(clippy::unwrap_used)]

mod support;

use serde_json::json;
use tempfile::TempDir;
use tunefetch_core::download::{DownloadError, PipelineError, StreamError, filename};
use tunefetch_core::{DownloadOutcome, DownloadTask, MediaKind, MediaReference, SkipReason};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{CopyTranscoder, FakeFeeder, files_below, harness, settings_in, track_json};

fn track_task(id: &str) -> DownloadTask {
    DownloadTask::new(MediaReference::new(MediaKind::Track, id))
}

async fn mount_track(server: &MockServer, requested: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/v1/tracks"))
        .and(query_param("ids", requested))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tracks": [body] })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_download_transcodes_tags_and_embeds_artwork() {
    let server = MockServer::start().await;
    let mut track = track_json("t1", "Opening", 1, 1);
    track["album"]["images"] = json!([{ "url": format!("{}/img/cover.jpg", server.uri()) }]);
    mount_track(&server, "t1", track).await;
    Mock::given(method("GET"))
        .and(path("/img/cover.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let h = harness(&server, settings_in(dir.path()), FakeFeeder::serving(b"audio-bytes"));

    let outcome = h.pipeline.process(track_task("t1")).await.unwrap();

    let DownloadOutcome::Downloaded { path } = outcome else {
        panic!("expected a download, got {outcome:?}");
    };
    assert_eq!(
        path,
        dir.path()
            .join("music")
            .join("The Band - The Record - Opening.mp3")
    );
    assert_eq!(std::fs::read(&path).unwrap(), b"audio-bytes");
    assert_eq!(
        files_below(dir.path()),
        vec!["music/The Band - The Record - Opening.mp3"]
    );

    let tags = h.tagger.tags.lock().unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].1.title, "Opening");
    assert_eq!(tags[0].1.year, Some(2004));
    assert_eq!(tags[0].1.comment, "id[spotify.com:track:t1]");
    assert_eq!(*h.tagger.artwork.lock().unwrap(), vec![b"jpeg-bytes".to_vec()]);
    assert_eq!(h.transcoder.calls(), 1);
}

#[tokio::test]
async fn test_second_run_skips_without_network_requests() {
    let server = MockServer::start().await;
    let mut track = track_json("t1", "Opening", 1, 1);
    track["album"]["images"] = json!([{ "url": format!("{}/img/cover.jpg", server.uri()) }]);
    Mock::given(method("GET"))
        .and(path("/v1/tracks"))
        .and(query_param("ids", "t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tracks": [track] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/cover.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let h = harness(&server, settings_in(dir.path()), FakeFeeder::serving(b"audio"));

    let first = h.pipeline.process(track_task("t1")).await.unwrap();
    assert!(first.is_downloaded());
    let before = files_below(dir.path());

    let second = h.pipeline.process(track_task("t1")).await.unwrap();

    assert!(matches!(
        second,
        DownloadOutcome::Skipped(SkipReason::AlreadyExists)
    ));
    assert_eq!(h.feeder.calls(), 1);
    assert_eq!(h.transcoder.calls(), 1);
    assert_eq!(files_below(dir.path()), before);
}

#[tokio::test]
async fn test_fresh_pipeline_skips_existing_file_after_lookup() {
    let server = MockServer::start().await;
    mount_track(&server, "t1", track_json("t1", "Opening", 1, 1)).await;

    let dir = TempDir::new().unwrap();
    let target = dir
        .path()
        .join("music")
        .join("The Band - The Record - Opening.mp3");
    std::fs::create_dir_all(target.parent().unwrap()).unwrap();
    std::fs::write(&target, b"earlier run").unwrap();
    let h = harness(&server, settings_in(dir.path()), FakeFeeder::serving(b"audio"));

    let outcome = h.pipeline.process(track_task("t1")).await.unwrap();

    assert!(matches!(
        outcome,
        DownloadOutcome::Skipped(SkipReason::AlreadyExists)
    ));
    assert_eq!(h.feeder.calls(), 0);
    assert_eq!(std::fs::read(&target).unwrap(), b"earlier run");
}

#[tokio::test]
async fn test_relinked_track_streams_canonical_id() {
    let server = MockServer::start().await;
    let mut relinked = track_json("canonical-9", "Moved", 1, 1);
    relinked["linked_from"] = json!({ "id": "requested-1" });
    mount_track(&server, "requested-1", relinked).await;

    let dir = TempDir::new().unwrap();
    let h = harness(&server, settings_in(dir.path()), FakeFeeder::serving(b"audio"));

    let outcome = h.pipeline.process(track_task("requested-1")).await.unwrap();

    assert!(outcome.is_downloaded());
    assert_eq!(h.feeder.requested_ids(), vec!["canonical-9"]);
    let tags = h.tagger.tags.lock().unwrap();
    assert_eq!(tags[0].1.comment, "id[spotify.com:track:canonical-9]");
}

#[tokio::test]
async fn test_exhausted_stream_retries_leave_no_files() {
    let server = MockServer::start().await;
    mount_track(&server, "t1", track_json("t1", "Fragile", 1, 1)).await;

    let dir = TempDir::new().unwrap();
    let h = harness(&server, settings_in(dir.path()), FakeFeeder::broken());

    let outcome = h.pipeline.process(track_task("t1")).await.unwrap();

    match outcome {
        DownloadOutcome::Failed(DownloadError::StreamExhausted {
            id,
            attempts,
            source,
        }) => {
            assert_eq!(id, "t1");
            assert_eq!(attempts, 3);
            assert!(matches!(source, StreamError::Io { .. }));
        }
        other => panic!("expected exhausted stream, got {other:?}"),
    }
    assert_eq!(h.feeder.calls(), 3);
    assert!(files_below(dir.path()).is_empty());
}

#[tokio::test]
async fn test_transcode_failure_keeps_raw_and_removes_staging() {
    let server = MockServer::start().await;
    mount_track(&server, "t1", track_json("t1", "Broken", 1, 1)).await;

    let dir = TempDir::new().unwrap();
    let settings = settings_in(dir.path());
    let h = harness(&server, settings, FakeFeeder::serving(b"audio"));
    let pipeline = h
        .pipeline
        .with_transcoder(std::sync::Arc::new(CopyTranscoder::failing()));

    let outcome = pipeline.process(track_task("t1")).await.unwrap();

    let DownloadOutcome::Failed(DownloadError::PostProcess { raw_path, .. }) = outcome else {
        panic!("expected post-processing failure, got {outcome:?}");
    };
    let target = dir
        .path()
        .join("music")
        .join("The Band - The Record - Broken.mp3");
    assert_eq!(raw_path, filename::raw_path(&target));
    assert_eq!(std::fs::read(&raw_path).unwrap(), b"audio");
    assert!(!target.exists());
    assert!(!filename::staging_path(&target).exists());
    assert!(!filename::part_path(&target).exists());
}

#[tokio::test]
async fn test_raw_passthrough_skips_post_processing() {
    let server = MockServer::start().await;
    mount_track(&server, "t1", track_json("t1", "Untouched", 1, 1)).await;

    let dir = TempDir::new().unwrap();
    let mut settings = settings_in(dir.path());
    settings.raw_passthrough = true;
    settings.output_format = "ogg".to_string();
    let h = harness(&server, settings, FakeFeeder::serving(b"vorbis"));

    let outcome = h.pipeline.process(track_task("t1")).await.unwrap();

    let DownloadOutcome::Downloaded { path } = outcome else {
        panic!("expected a download, got {outcome:?}");
    };
    assert!(path.ends_with("The Band - The Record - Untouched.ogg"));
    assert_eq!(std::fs::read(&path).unwrap(), b"vorbis");
    assert_eq!(h.transcoder.calls(), 0);
    assert!(h.tagger.tags.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unplayable_track_is_skipped_without_streaming() {
    let server = MockServer::start().await;
    let mut track = track_json("t1", "Region Locked", 1, 1);
    track["is_playable"] = json!(false);
    mount_track(&server, "t1", track).await;

    let dir = TempDir::new().unwrap();
    let h = harness(&server, settings_in(dir.path()), FakeFeeder::serving(b"audio"));

    let outcome = h.pipeline.process(track_task("t1")).await.unwrap();

    assert!(matches!(
        outcome,
        DownloadOutcome::Skipped(SkipReason::Unavailable)
    ));
    assert_eq!(h.feeder.calls(), 0);
}

#[tokio::test]
async fn test_null_catalog_entry_is_skipped_not_found() {
    let server = MockServer::start().await;
    mount_track(&server, "gone", serde_json::Value::Null).await;

    let dir = TempDir::new().unwrap();
    let h = harness(&server, settings_in(dir.path()), FakeFeeder::serving(b"audio"));

    let outcome = h.pipeline.process(track_task("gone")).await.unwrap();

    assert!(matches!(outcome, DownloadOutcome::Skipped(SkipReason::NotFound)));
    assert_eq!(h.feeder.calls(), 0);
}

#[tokio::test]
async fn test_rejected_session_is_pipeline_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tracks"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let h = harness(&server, settings_in(dir.path()), FakeFeeder::serving(b"audio"));

    let result = h.pipeline.process(track_task("t1")).await;

    assert!(matches!(result, Err(PipelineError::Authorization { .. })));
    assert_eq!(h.feeder.calls(), 0);
}

#[tokio::test]
async fn test_episode_lands_in_show_folder_under_podcast_root() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/episodes/e1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "e1",
            "name": "Pilot",
            "show": { "id": "s1", "name": "Night Talk", "publisher": "Studio" },
            "images": [],
            "release_date": "2021-02-03"
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let h = harness(&server, settings_in(dir.path()), FakeFeeder::serving(b"speech"));

    let outcome = h
        .pipeline
        .process(DownloadTask::new(MediaReference::new(MediaKind::Episode, "e1")))
        .await
        .unwrap();

    assert!(outcome.is_downloaded());
    assert_eq!(
        files_below(dir.path()),
        vec!["podcasts/Night Talk/Studio - Night Talk - Pilot.mp3"]
    );
}
