//! Integration tests for the catalog client, paginator and metadata fetcher.

#![allow(clippy::unwrap_used)]

mod support;

use serde_json::{Value, json};
use tunefetch_core::catalog::DEFAULT_MARKET;
use tunefetch_core::{CatalogError, MetadataFetcher};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{catalog_client, track_json};

fn numbered(count: usize, start: usize) -> Value {
    let items: Vec<Value> = (start..start + count).map(|n| json!({ "n": n })).collect();
    json!({ "items": items })
}

async fn mount_page(server: &MockServer, endpoint: &str, offset: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .and(query_param("offset", offset.to_string()))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_paginator_stops_after_short_final_page() {
    let server = MockServer::start().await;
    for (offset, count) in [(0, 50), (50, 50), (100, 50), (150, 30)] {
        mount_page(&server, "/v1/albums/a1/tracks", offset, numbered(count, offset as usize)).await;
    }
    let client = catalog_client(&server);

    let items: Vec<Value> = client
        .paginate("albums/a1/tracks", 50)
        .collect_all()
        .await
        .unwrap();

    assert_eq!(items.len(), 180);
    let numbers: Vec<u64> = items.iter().map(|item| item["n"].as_u64().unwrap()).collect();
    assert_eq!(numbers, (0..180).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_paginator_stops_after_empty_page() {
    let server = MockServer::start().await;
    mount_page(&server, "/v1/me/tracks", 0, numbered(50, 0)).await;
    mount_page(&server, "/v1/me/tracks", 50, numbered(50, 50)).await;
    mount_page(&server, "/v1/me/tracks", 100, json!({ "items": [] })).await;
    let client = catalog_client(&server);

    let mut paginator = client.paginate::<Value>("me/tracks", 50);
    let mut total = 0;
    while let Some(page) = paginator.next_page().await.unwrap() {
        total += page.len();
    }

    assert_eq!(total, 100);
    assert_eq!(paginator.pages_fetched(), 3);
    assert!(paginator.is_complete());
}

#[tokio::test]
async fn test_paginator_failure_reports_items_yielded() {
    let server = MockServer::start().await;
    mount_page(&server, "/v1/me/tracks", 0, numbered(50, 0)).await;
    Mock::given(method("GET"))
        .and(path("/v1/me/tracks"))
        .and(query_param("offset", "50"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    let client = catalog_client(&server);

    let result = client.paginate::<Value>("me/tracks", 50).collect_all().await;

    match result {
        Err(CatalogError::PaginationAborted {
            offset,
            items_yielded,
            ..
        }) => {
            assert_eq!(offset, 50);
            assert_eq!(items_yielded, 50);
        }
        other => panic!("expected aborted pagination, got {other:?}"),
    }
}

#[tokio::test]
async fn test_requests_carry_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tracks"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("market", DEFAULT_MARKET))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "tracks": [track_json("t1", "Song", 1, 3)] })),
        )
        .expect(1)
        .mount(&server)
        .await;
    let fetcher = MetadataFetcher::new(catalog_client(&server));

    let track = fetcher.fetch_track("t1").await.unwrap();

    assert_eq!(track.title, "Song");
    assert_eq!(track.track_number, Some(3));
    assert_eq!(track.primary_artist(), "The Band");
}

#[tokio::test]
async fn test_fetch_track_returns_relinked_identity() {
    let server = MockServer::start().await;
    let mut body = track_json("new-id", "Song", 1, 1);
    body["linked_from"] = json!({ "id": "old-id" });
    Mock::given(method("GET"))
        .and(path("/v1/tracks"))
        .and(query_param("ids", "old-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tracks": [body] })))
        .mount(&server)
        .await;
    let fetcher = MetadataFetcher::new(catalog_client(&server));

    let track = fetcher.fetch_track("old-id").await.unwrap();

    assert_eq!(track.canonical_id, "new-id");
}

#[tokio::test]
async fn test_fetch_track_missing_or_untitled_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tracks"))
        .and(query_param("ids", "missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/tracks"))
        .and(query_param("ids", "untitled"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "tracks": [track_json("untitled", "", 1, 1)] })),
        )
        .mount(&server)
        .await;
    let fetcher = MetadataFetcher::new(catalog_client(&server));

    assert!(fetcher.fetch_track("missing").await.unwrap_err().is_not_found());
    assert!(fetcher.fetch_track("untitled").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_rate_limited_request_is_retried_after_server_delay() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/artists/ar1"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/artists/ar1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "ar1", "name": "Solo" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    let fetcher = MetadataFetcher::new(catalog_client(&server));

    let artist = fetcher.fetch_artist("ar1").await.unwrap();

    assert_eq!(artist.name, "Solo");
}

#[tokio::test]
async fn test_unauthorized_is_fatal_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/a1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    let fetcher = MetadataFetcher::new(catalog_client(&server));

    let error = fetcher.fetch_album("a1").await.unwrap_err();

    assert!(error.is_fatal());
}

#[tokio::test]
async fn test_fetch_album_groups_tracks_by_disc() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a1",
            "name": "Double",
            "artists": [{ "id": "artist-1", "name": "The Band" }],
            "release_date": "1999",
            "total_tracks": 4
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/a1/tracks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                track_json("d2t2", "Four", 2, 2),
                track_json("d1t2", "Two", 1, 2),
                track_json("d1t1", "One", 1, 1),
                track_json("d2t1", "Three", 2, 1)
            ]
        })))
        .mount(&server)
        .await;
    let fetcher = MetadataFetcher::new(catalog_client(&server));

    let album = fetcher.fetch_album("a1").await.unwrap();

    assert_eq!(album.name, "Double");
    assert_eq!(album.primary_artist, "The Band");
    assert_eq!(album.release_year, Some(1999));
    assert!(album.is_multi_disc());
    let groups: Vec<(Option<u32>, Vec<String>)> = album
        .disc_groups()
        .into_iter()
        .map(|group| (group.disc, group.tracks.into_iter().map(|t| t.id).collect()))
        .collect();
    assert_eq!(
        groups,
        vec![
            (Some(1), vec!["d1t1".to_string(), "d1t2".to_string()]),
            (Some(2), vec!["d2t1".to_string(), "d2t2".to_string()]),
        ]
    );
}

#[tokio::test]
async fn test_fetch_album_skips_null_listing_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a1",
            "name": "Gappy",
            "artists": [{ "id": "artist-1", "name": "The Band" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/a1/tracks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                track_json("t1", "One", 1, 1),
                null,
                track_json("t3", "Three", 1, 3)
            ]
        })))
        .mount(&server)
        .await;
    let fetcher = MetadataFetcher::new(catalog_client(&server));

    let album = fetcher.fetch_album("a1").await.unwrap();

    let ids: Vec<&str> = album.tracks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t3"]);
    assert_eq!(album.unavailable, 1);
}

#[tokio::test]
async fn test_fetch_artist_albums_reads_release_kinds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/artists/ar1/albums"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "al1",
                    "name": "Debut",
                    "album_type": "album",
                    "artists": [{ "id": "ar1", "name": "Solo" }]
                },
                {
                    "id": "al2",
                    "name": "Radio Edit",
                    "album_type": "single",
                    "artists": [{ "id": "ar1", "name": "Solo" }]
                }
            ]
        })))
        .mount(&server)
        .await;
    let fetcher = MetadataFetcher::new(catalog_client(&server));

    let albums = fetcher.fetch_artist_albums("ar1").await.unwrap();

    assert_eq!(albums.len(), 2);
    assert!(!albums[0].is_single());
    assert!(albums[1].is_single());
    assert!(albums[0].is_primary_artist("ar1"));
}
