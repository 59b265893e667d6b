//! Integration tests for multi-type search and result selection.

#![allow(clippy::unwrap_used)]

mod support;

use serde_json::json;
use tunefetch_core::search::MAX_SEARCH_LIMIT;
use tunefetch_core::{MediaKind, SearchIndexer, SearchSelection, SelectionError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::catalog_client;

async fn mount_search(server: &MockServer, limit: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("q", "night drive"))
        .and(query_param("type", "track,album,playlist,artist"))
        .and(query_param("limit", limit))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tracks": { "items": [
                { "id": "t1", "name": "Night Drive", "explicit": true,
                  "artists": [{ "name": "Neon" }] },
                null,
                { "id": "t2", "name": "Drive Home", "artists": [{ "name": "Dusk" }] }
            ]},
            "albums": { "items": [
                { "id": "a1", "name": "Night Drives", "release_date": "2019-01-01",
                  "total_tracks": 9, "artists": [{ "name": "Neon" }] }
            ]},
            "playlists": { "items": [
                { "id": "p1", "name": "Late", "owner": { "display_name": "kim" } },
                { "id": "p2", "name": "Later" },
                { "id": "p3", "name": "Latest" }
            ]},
            "artists": { "items": [] }
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_search_numbers_results_across_types() {
    let server = MockServer::start().await;
    mount_search(&server, "10").await;
    let indexer = SearchIndexer::new(catalog_client(&server), 10);

    let index = indexer.search("night drive").await.unwrap();

    assert_eq!(index.len(), 6);
    assert_eq!(index.boundaries(), (2, 1, 3, 0));
    assert_eq!(index.tracks()[0].artists, vec!["Neon".to_string()]);
    assert!(index.tracks()[0].explicit);
    assert_eq!(index.albums()[0].release_year, Some(2019));

    let third = index.resolve(3).unwrap();
    assert_eq!(third.kind(), MediaKind::Album);
    assert_eq!(third.reference().id, "a1");

    let picked: Vec<String> = index
        .select("4-6")
        .unwrap()
        .into_iter()
        .map(|selection| match selection.unwrap() {
            SearchSelection::Playlist(hit) => hit.id,
            other => panic!("expected a playlist, got {other:?}"),
        })
        .collect();
    assert_eq!(picked, vec!["p1", "p2", "p3"]);
}

#[tokio::test]
async fn test_out_of_range_selection_is_reported_per_item() {
    let server = MockServer::start().await;
    mount_search(&server, "10").await;
    let indexer = SearchIndexer::new(catalog_client(&server), 10);
    let index = indexer.search("night drive").await.unwrap();

    let resolved = index.select("1,7").unwrap();

    assert_eq!(resolved.len(), 2);
    assert!(resolved[0].is_ok());
    assert!(matches!(
        resolved[1],
        Err(SelectionError::OutOfRange { index: 7, max: 6 })
    ));
}

#[tokio::test]
async fn test_search_limit_is_clamped() {
    let server = MockServer::start().await;
    mount_search(&server, &MAX_SEARCH_LIMIT.to_string()).await;
    let indexer = SearchIndexer::new(catalog_client(&server), 500);

    let index = indexer.search("night drive").await.unwrap();

    assert_eq!(indexer.limit(), MAX_SEARCH_LIMIT);
    assert!(!index.is_empty());
}
