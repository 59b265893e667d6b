//! Catalog API response types.
//!
//! Every field the catalog may omit or null out is an `Option` (or a
//! defaulted collection); validation into domain types happens in
//! [`super::metadata`].

use serde::Deserialize;

/// One page of an offset/limit paginated collection.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub total: Option<u32>,
    pub next: Option<String>,
}

/// Response of `tracks?ids=`.
#[derive(Debug, Deserialize)]
pub struct TracksResponse {
    #[serde(default)]
    pub tracks: Vec<Option<TrackDto>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRefDto {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageDto {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Album as embedded in tracks, search results and artist discographies.
#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRefDto {
    pub id: Option<String>,
    pub name: Option<String>,
    pub album_type: Option<String>,
    #[serde(default)]
    pub artists: Vec<ArtistRefDto>,
    #[serde(default)]
    pub images: Vec<ImageDto>,
    pub release_date: Option<String>,
    pub total_tracks: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkedFromDto {
    pub id: Option<String>,
}

/// Track as returned by `tracks`, album track listings, playlists and search.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackDto {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<ArtistRefDto>,
    pub album: Option<AlbumRefDto>,
    pub disc_number: Option<u32>,
    pub track_number: Option<u32>,
    pub is_playable: Option<bool>,
    pub is_local: Option<bool>,
    pub explicit: Option<bool>,
    pub linked_from: Option<LinkedFromDto>,
}

/// Entry of a playlist or of the saved-tracks library.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItemDto {
    pub track: Option<TrackDto>,
}

/// Album as returned by `albums/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct AlbumDto {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<ArtistRefDto>,
    pub release_date: Option<String>,
    pub total_tracks: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistDto {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerDto {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

/// Playlist as returned by `playlists/{id}`, `me/playlists` and search.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistDto {
    pub id: Option<String>,
    pub name: Option<String>,
    pub owner: Option<OwnerDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShowRefDto {
    pub id: Option<String>,
    pub name: Option<String>,
    pub publisher: Option<String>,
}

/// Episode as returned by `episodes/{id}` and show listings.
#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeDto {
    pub id: Option<String>,
    pub name: Option<String>,
    pub show: Option<ShowRefDto>,
    #[serde(default)]
    pub images: Vec<ImageDto>,
    pub release_date: Option<String>,
    pub is_playable: Option<bool>,
}

/// Show as returned by `shows/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShowDto {
    pub id: Option<String>,
    pub name: Option<String>,
    pub publisher: Option<String>,
}

/// Response of the multi-type `search` endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub tracks: Option<Page<Option<TrackDto>>>,
    pub albums: Option<Page<Option<AlbumRefDto>>>,
    pub playlists: Option<Page<Option<PlaylistDto>>>,
    pub artists: Option<Page<Option<ArtistDto>>>,
}

/// Leading four-digit year of a catalog release date (`1997`, `1997-05`, `1997-05-21`).
#[must_use]
pub fn release_year(release_date: Option<&str>) -> Option<u32> {
    let date = release_date?;
    let year = date.get(..4)?;
    year.parse().ok()
}

/// Non-empty trimmed string, or `None`.
#[must_use]
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
