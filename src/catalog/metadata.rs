//! Normalized metadata for tracks, episodes, albums, artists, playlists and shows.
//!
//! [`MetadataFetcher`] turns catalog DTOs into validated domain types. Entries
//! that were deleted from the catalog, or that come back without a title, are
//! reported as [`CatalogError::NotFound`] instead of being passed along with
//! placeholder values.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::client::CatalogClient;
use super::dto::{
    AlbumDto, AlbumRefDto, ArtistDto, EpisodeDto, PlaylistDto, PlaylistItemDto, ShowDto,
    TrackDto, TracksResponse, non_empty, release_year,
};
use super::error::CatalogError;
use super::paginator::CollectionPaginator;
use crate::parser::MediaKind;

/// Page size for album track listings.
pub const ALBUM_TRACKS_PAGE_SIZE: u32 = 50;

/// Page size for artist discographies.
pub const ARTIST_ALBUMS_PAGE_SIZE: u32 = 50;

/// Page size for playlist track listings.
pub const PLAYLIST_TRACKS_PAGE_SIZE: u32 = 100;

/// Page size for show episode listings, saved tracks and user playlists.
pub const LIBRARY_PAGE_SIZE: u32 = 50;

/// Placeholder for tracks the catalog lists without any artist.
const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Metadata of one downloadable item (track or episode).
///
/// Fetched fresh for every download; never cached across items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    /// Whether this is a music track or a podcast episode.
    pub kind: MediaKind,
    /// Artist names in catalog order (the show publisher for episodes).
    pub artists: Vec<String>,
    /// Album name (the show name for episodes).
    pub album_name: String,
    /// Track or episode title.
    pub title: String,
    /// Largest cover image, when the catalog has one.
    pub artwork_url: Option<String>,
    /// Release year.
    pub release_year: Option<u32>,
    /// Disc number within the album.
    pub disc_number: Option<u32>,
    /// Track number within the disc.
    pub track_number: Option<u32>,
    /// Id the catalog currently considers authoritative; used for streaming.
    pub canonical_id: String,
    /// Whether the item can be streamed in the session's market.
    pub is_playable: bool,
}

impl TrackMetadata {
    /// First listed artist.
    #[must_use]
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map_or(UNKNOWN_ARTIST, String::as_str)
    }

    /// All artists joined for the artist tag.
    #[must_use]
    pub fn joined_artists(&self) -> String {
        self.artists.join(", ")
    }

    /// Human-readable label for progress and skip messages.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} - {}", self.primary_artist(), self.title)
    }
}

/// One track of an album listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumTrack {
    /// Catalog id.
    pub id: String,
    /// Title as listed.
    pub title: String,
    /// Disc number (1 when absent).
    pub disc_number: u32,
    /// Position within the disc; 0 when the catalog omits it, which sorts the
    /// track first and renders as the `00.` prefix.
    pub track_number: u32,
}

/// Tracks of one disc, in track-number order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscGroup {
    /// Disc number, or `None` for single-disc albums (no sub-folder).
    pub disc: Option<u32>,
    /// Tracks of this disc.
    pub tracks: Vec<AlbumTrack>,
}

/// Album with its complete track listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumMetadata {
    /// Catalog id.
    pub id: String,
    /// Album name.
    pub name: String,
    /// Primary album artist.
    pub primary_artist: String,
    /// Release year.
    pub release_year: Option<u32>,
    /// Track count announced by the catalog.
    pub total_tracks: Option<u32>,
    /// Track listing in catalog order.
    pub tracks: Vec<AlbumTrack>,
    /// Listing entries that were null or had no id.
    pub unavailable: usize,
}

impl AlbumMetadata {
    /// Whether any track sits on a disc after the first.
    #[must_use]
    pub fn is_multi_disc(&self) -> bool {
        self.tracks.iter().any(|track| track.disc_number > 1)
    }

    /// Groups tracks by disc.
    ///
    /// Multi-disc albums get one group per disc, ascending; single-disc albums
    /// get a single group without a disc number. Tracks within a group are
    /// ordered by track number, ties keeping catalog order.
    #[must_use]
    pub fn disc_groups(&self) -> Vec<DiscGroup> {
        if !self.is_multi_disc() {
            let mut tracks = self.tracks.clone();
            tracks.sort_by_key(|track| track.track_number);
            return vec![DiscGroup { disc: None, tracks }];
        }

        let mut discs: BTreeMap<u32, Vec<AlbumTrack>> = BTreeMap::new();
        for track in &self.tracks {
            discs
                .entry(track.disc_number)
                .or_default()
                .push(track.clone());
        }
        discs
            .into_iter()
            .map(|(disc, mut tracks)| {
                tracks.sort_by_key(|track| track.track_number);
                DiscGroup {
                    disc: Some(disc),
                    tracks,
                }
            })
            .collect()
    }
}

/// Album entry of an artist discography.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistAlbum {
    /// Catalog id.
    pub id: String,
    /// Album name.
    pub name: String,
    /// `album`, `single`, `compilation` or `appears_on`.
    pub album_type: Option<String>,
    /// Id of the first listed album artist.
    pub primary_artist_id: Option<String>,
    /// Name of the first listed album artist.
    pub primary_artist_name: Option<String>,
    /// Release year.
    pub release_year: Option<u32>,
    /// Track count.
    pub total_tracks: Option<u32>,
}

impl ArtistAlbum {
    /// Whether the release is a single.
    #[must_use]
    pub fn is_single(&self) -> bool {
        self.album_type.as_deref() == Some("single")
    }

    /// Whether `artist_id` is the release's primary artist.
    #[must_use]
    pub fn is_primary_artist(&self, artist_id: &str) -> bool {
        self.primary_artist_id.as_deref() == Some(artist_id)
    }
}

/// Artist identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistInfo {
    /// Catalog id.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Playlist identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistInfo {
    /// Catalog id.
    pub id: String,
    /// Playlist name.
    pub name: String,
    /// Owner display name.
    pub owner: Option<String>,
}

/// Show identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowInfo {
    /// Catalog id.
    pub id: String,
    /// Show name.
    pub name: String,
    /// Publisher.
    pub publisher: Option<String>,
}

/// A track entry of a playlist or of the saved-tracks library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionEntry {
    /// Track id, or `None` when the entry cannot be downloaded.
    pub id: Option<String>,
    /// Label for reporting.
    pub label: String,
}

impl CollectionEntry {
    /// Extracts the downloadable track from a playlist/library item.
    ///
    /// Removed tracks (`null`), local files and entries without an id yield
    /// an entry with `id == None`.
    #[must_use]
    pub fn from_item(item: &PlaylistItemDto) -> Self {
        let Some(track) = &item.track else {
            return Self {
                id: None,
                label: "removed track".to_string(),
            };
        };
        let label = non_empty(track.name.as_deref()).unwrap_or("untitled track").to_string();
        if track.is_local == Some(true) {
            return Self { id: None, label };
        }
        Self {
            id: non_empty(track.id.as_deref()).map(ToString::to_string),
            label,
        }
    }
}

/// Lookup operations the download pipeline needs.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetches track metadata.
    async fn track(&self, id: &str) -> Result<TrackMetadata, CatalogError>;

    /// Fetches episode metadata.
    async fn episode(&self, id: &str) -> Result<TrackMetadata, CatalogError>;

    /// Downloads cover artwork.
    async fn artwork(&self, url: &str) -> Result<Vec<u8>, CatalogError>;
}

/// Retrieves and normalizes catalog metadata.
#[derive(Debug, Clone)]
pub struct MetadataFetcher {
    client: CatalogClient,
}

impl MetadataFetcher {
    /// Creates a fetcher over a catalog client.
    #[must_use]
    pub fn new(client: CatalogClient) -> Self {
        Self { client }
    }

    /// Underlying catalog client.
    #[must_use]
    pub fn client(&self) -> &CatalogClient {
        &self.client
    }

    /// Fetches one track.
    ///
    /// The returned `canonical_id` is the id the catalog answered with, which
    /// differs from `id` when the track has been relinked.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] for a missing entry or empty title; other
    /// variants for request failures.
    #[instrument(skip(self))]
    pub async fn fetch_track(&self, id: &str) -> Result<TrackMetadata, CatalogError> {
        let response: TracksResponse = self
            .client
            .get_json("tracks", &[("ids", id), ("market", self.client.market())])
            .await
            .map_err(|error| not_found_on_404(error, MediaKind::Track, id))?;
        let track = response
            .tracks
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| CatalogError::not_found(MediaKind::Track, id))?;
        track_metadata(track, id)
    }

    /// Fetches one podcast episode in the same shape as a track.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] for a missing entry or empty title.
    #[instrument(skip(self))]
    pub async fn fetch_episode(&self, id: &str) -> Result<TrackMetadata, CatalogError> {
        let episode: EpisodeDto = self
            .client
            .get_json(
                &format!("episodes/{id}"),
                &[("market", self.client.market())],
            )
            .await
            .map_err(|error| not_found_on_404(error, MediaKind::Episode, id))?;
        episode_metadata(episode, id)
    }

    /// Fetches an album and its complete, paginated track listing.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] for a missing album;
    /// [`CatalogError::PaginationAborted`] if the listing cannot be completed.
    #[instrument(skip(self))]
    pub async fn fetch_album(&self, id: &str) -> Result<AlbumMetadata, CatalogError> {
        let album: AlbumDto = self
            .client
            .get_json(&format!("albums/{id}"), &[])
            .await
            .map_err(|error| not_found_on_404(error, MediaKind::Album, id))?;
        let name = non_empty(album.name.as_deref())
            .ok_or_else(|| CatalogError::not_found(MediaKind::Album, id))?
            .to_string();

        let listed: Vec<Option<TrackDto>> = self
            .client
            .paginate(format!("albums/{id}/tracks"), ALBUM_TRACKS_PAGE_SIZE)
            .collect_all()
            .await?;
        let listed_count = listed.len();
        let tracks: Vec<AlbumTrack> = listed
            .into_iter()
            .flatten()
            .filter_map(|track| {
                let track_id = non_empty(track.id.as_deref())?;
                Some(AlbumTrack {
                    id: track_id.to_string(),
                    title: track.name.clone().unwrap_or_default(),
                    disc_number: track.disc_number.unwrap_or(1),
                    track_number: track.track_number.unwrap_or(0),
                })
            })
            .collect();
        let unavailable = listed_count - tracks.len();
        if unavailable > 0 {
            warn!(album = %id, unavailable, "album listing has entries without a track");
        }
        debug!(tracks = tracks.len(), "album listing fetched");

        Ok(AlbumMetadata {
            id: album.id.unwrap_or_else(|| id.to_string()),
            name,
            primary_artist: first_artist_name(&album.artists),
            release_year: release_year(album.release_date.as_deref()),
            total_tracks: album.total_tracks,
            tracks,
            unavailable,
        })
    }

    /// Fetches an artist.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] for a missing artist.
    #[instrument(skip(self))]
    pub async fn fetch_artist(&self, id: &str) -> Result<ArtistInfo, CatalogError> {
        let artist: ArtistDto = self
            .client
            .get_json(&format!("artists/{id}"), &[])
            .await
            .map_err(|error| not_found_on_404(error, MediaKind::Artist, id))?;
        let name = non_empty(artist.name.as_deref())
            .ok_or_else(|| CatalogError::not_found(MediaKind::Artist, id))?;
        Ok(ArtistInfo {
            id: id.to_string(),
            name: name.to_string(),
        })
    }

    /// Fetches an artist's complete discography.
    ///
    /// # Errors
    ///
    /// [`CatalogError::PaginationAborted`] if the listing cannot be completed.
    #[instrument(skip(self))]
    pub async fn fetch_artist_albums(&self, id: &str) -> Result<Vec<ArtistAlbum>, CatalogError> {
        let albums: Vec<AlbumRefDto> = self
            .client
            .paginate(format!("artists/{id}/albums"), ARTIST_ALBUMS_PAGE_SIZE)
            .collect_all()
            .await?;
        Ok(albums.into_iter().filter_map(artist_album).collect())
    }

    /// Fetches a playlist's identity.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] for a missing playlist.
    #[instrument(skip(self))]
    pub async fn fetch_playlist(&self, id: &str) -> Result<PlaylistInfo, CatalogError> {
        let playlist: PlaylistDto = self
            .client
            .get_json(&format!("playlists/{id}"), &[("fields", "id,name,owner")])
            .await
            .map_err(|error| not_found_on_404(error, MediaKind::Playlist, id))?;
        playlist_info(playlist).ok_or_else(|| CatalogError::not_found(MediaKind::Playlist, id))
    }

    /// Lazily traverses a playlist's track entries.
    #[must_use]
    pub fn playlist_entries(&self, id: &str) -> CollectionPaginator<PlaylistItemDto> {
        self.client.paginate(
            format!("playlists/{id}/tracks"),
            PLAYLIST_TRACKS_PAGE_SIZE,
        )
    }

    /// Lazily traverses the current user's saved tracks.
    #[must_use]
    pub fn saved_track_entries(&self) -> CollectionPaginator<PlaylistItemDto> {
        self.client.paginate("me/tracks", LIBRARY_PAGE_SIZE)
    }

    /// Fetches every playlist of the current user.
    ///
    /// # Errors
    ///
    /// [`CatalogError::PaginationAborted`] if the listing cannot be completed.
    #[instrument(skip(self))]
    pub async fn fetch_user_playlists(&self) -> Result<Vec<PlaylistInfo>, CatalogError> {
        let playlists: Vec<Option<PlaylistDto>> = self
            .client
            .paginate("me/playlists", LIBRARY_PAGE_SIZE)
            .collect_all()
            .await?;
        Ok(playlists
            .into_iter()
            .flatten()
            .filter_map(playlist_info)
            .collect())
    }

    /// Fetches a show's identity.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] for a missing show.
    #[instrument(skip(self))]
    pub async fn fetch_show(&self, id: &str) -> Result<ShowInfo, CatalogError> {
        let show: ShowDto = self
            .client
            .get_json(&format!("shows/{id}"), &[("market", self.client.market())])
            .await
            .map_err(|error| not_found_on_404(error, MediaKind::Show, id))?;
        let name = non_empty(show.name.as_deref())
            .ok_or_else(|| CatalogError::not_found(MediaKind::Show, id))?;
        Ok(ShowInfo {
            id: show.id.unwrap_or_else(|| id.to_string()),
            name: name.to_string(),
            publisher: show.publisher,
        })
    }

    /// Lazily traverses a show's episodes.
    #[must_use]
    pub fn show_episodes(&self, id: &str) -> CollectionPaginator<Option<EpisodeDto>> {
        self.client.paginate_with_query(
            format!("shows/{id}/episodes"),
            vec![("market".to_string(), self.client.market().to_string())],
            LIBRARY_PAGE_SIZE,
        )
    }
}

#[async_trait]
impl MetadataSource for MetadataFetcher {
    async fn track(&self, id: &str) -> Result<TrackMetadata, CatalogError> {
        self.fetch_track(id).await
    }

    async fn episode(&self, id: &str) -> Result<TrackMetadata, CatalogError> {
        self.fetch_episode(id).await
    }

    async fn artwork(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        self.client.fetch_bytes(url).await
    }
}

fn not_found_on_404(error: CatalogError, kind: MediaKind, id: &str) -> CatalogError {
    if error.is_not_found() {
        CatalogError::not_found(kind, id)
    } else {
        error
    }
}

fn first_artist_name(artists: &[super::dto::ArtistRefDto]) -> String {
    artists
        .iter()
        .find_map(|artist| non_empty(artist.name.as_deref()))
        .unwrap_or(UNKNOWN_ARTIST)
        .to_string()
}

/// Validates a track DTO into metadata.
pub(crate) fn track_metadata(track: TrackDto, requested_id: &str) -> Result<TrackMetadata, CatalogError> {
    let title = non_empty(track.name.as_deref())
        .ok_or_else(|| CatalogError::not_found(MediaKind::Track, requested_id))?
        .to_string();
    let artists: Vec<String> = track
        .artists
        .iter()
        .filter_map(|artist| non_empty(artist.name.as_deref()).map(ToString::to_string))
        .collect();
    let album = track.album.as_ref();
    let canonical_id = non_empty(track.id.as_deref())
        .unwrap_or(requested_id)
        .to_string();
    if canonical_id != requested_id {
        debug!(requested_id, canonical_id = %canonical_id, "track relinked");
    }

    Ok(TrackMetadata {
        kind: MediaKind::Track,
        artists,
        album_name: album
            .and_then(|a| non_empty(a.name.as_deref()))
            .unwrap_or_default()
            .to_string(),
        title,
        artwork_url: album
            .and_then(|a| a.images.first())
            .map(|image| image.url.clone()),
        release_year: release_year(album.and_then(|a| a.release_date.as_deref())),
        disc_number: track.disc_number,
        track_number: track.track_number,
        canonical_id,
        is_playable: track.is_playable.unwrap_or(true),
    })
}

fn episode_metadata(episode: EpisodeDto, requested_id: &str) -> Result<TrackMetadata, CatalogError> {
    let title = non_empty(episode.name.as_deref())
        .ok_or_else(|| CatalogError::not_found(MediaKind::Episode, requested_id))?
        .to_string();
    let show = episode.show.as_ref();
    let show_name = show
        .and_then(|s| non_empty(s.name.as_deref()))
        .unwrap_or("Unknown Show")
        .to_string();
    let publisher = show
        .and_then(|s| non_empty(s.publisher.as_deref()))
        .map_or_else(|| show_name.clone(), ToString::to_string);

    Ok(TrackMetadata {
        kind: MediaKind::Episode,
        artists: vec![publisher],
        album_name: show_name,
        title,
        artwork_url: episode.images.first().map(|image| image.url.clone()),
        release_year: release_year(episode.release_date.as_deref()),
        disc_number: None,
        track_number: None,
        canonical_id: non_empty(episode.id.as_deref())
            .unwrap_or(requested_id)
            .to_string(),
        is_playable: episode.is_playable.unwrap_or(true),
    })
}

fn artist_album(album: AlbumRefDto) -> Option<ArtistAlbum> {
    let id = non_empty(album.id.as_deref())?.to_string();
    Some(ArtistAlbum {
        id,
        name: album.name.unwrap_or_default(),
        album_type: album.album_type,
        primary_artist_id: album.artists.first().and_then(|artist| artist.id.clone()),
        primary_artist_name: album.artists.first().and_then(|artist| artist.name.clone()),
        release_year: release_year(album.release_date.as_deref()),
        total_tracks: album.total_tracks,
    })
}

fn playlist_info(playlist: PlaylistDto) -> Option<PlaylistInfo> {
    let id = non_empty(playlist.id.as_deref())?.to_string();
    let name = non_empty(playlist.name.as_deref())?.to_string();
    Some(PlaylistInfo {
        id,
        name,
        owner: playlist
            .owner
            .and_then(|owner| owner.display_name.or(owner.id)),
    })
}
