//! Multi-type catalog search with one flat selection numbering.
//!
//! A search returns up to `limit` tracks, albums, playlists and artists.
//! [`FlattenedSearchIndex`] numbers them consecutively from 1 in that fixed
//! type order, so a single index (or list, or range) picks items across
//! type blocks.
//!
//! ```
//! use tunefetch_core::search::{FlattenedSearchIndex, PlaylistHit, SearchSelection, TrackHit};
//!
//! let index = FlattenedSearchIndex::new(
//!     vec![TrackHit { id: "t1".into(), title: "One".into(), artists: vec![], explicit: false }],
//!     vec![],
//!     vec![PlaylistHit { id: "p1".into(), name: "Mix".into(), owner: None }],
//!     vec![],
//! );
//! assert_eq!(index.len(), 2);
//! assert!(matches!(index.resolve(2), Some(SearchSelection::Playlist(_))));
//! assert!(index.resolve(3).is_none());
//! ```

use tracing::{debug, instrument};

use crate::catalog::dto::{AlbumRefDto, ArtistDto, PlaylistDto, SearchResponse, TrackDto};
use crate::catalog::dto::{non_empty, release_year};
use crate::catalog::{CatalogClient, CatalogError};
use crate::parser::{MediaKind, MediaReference, SelectionError, parse_selection};

/// Largest per-type result count the search endpoint serves.
pub const MAX_SEARCH_LIMIT: u32 = 50;

/// Track result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackHit {
    /// Catalog id.
    pub id: String,
    /// Track title.
    pub title: String,
    /// Artist names.
    pub artists: Vec<String>,
    /// Explicit-content flag.
    pub explicit: bool,
}

/// Album result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumHit {
    /// Catalog id.
    pub id: String,
    /// Album name.
    pub name: String,
    /// Artist names.
    pub artists: Vec<String>,
    /// Release year.
    pub release_year: Option<u32>,
    /// Track count.
    pub total_tracks: Option<u32>,
}

/// Playlist result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistHit {
    /// Catalog id.
    pub id: String,
    /// Playlist name.
    pub name: String,
    /// Owner display name.
    pub owner: Option<String>,
}

/// Artist result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistHit {
    /// Catalog id.
    pub id: String,
    /// Artist name.
    pub name: String,
}

/// One selectable search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchSelection {
    /// A track; downloaded on its own.
    Track(TrackHit),
    /// An album; downloaded in full.
    Album(AlbumHit),
    /// A playlist; downloaded in full.
    Playlist(PlaylistHit),
    /// An artist; their discography is downloaded.
    Artist(ArtistHit),
}

impl SearchSelection {
    /// Kind of the selected item.
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Track(_) => MediaKind::Track,
            Self::Album(_) => MediaKind::Album,
            Self::Playlist(_) => MediaKind::Playlist,
            Self::Artist(_) => MediaKind::Artist,
        }
    }

    /// Reference to the selected item.
    #[must_use]
    pub fn reference(&self) -> MediaReference {
        let id = match self {
            Self::Track(hit) => &hit.id,
            Self::Album(hit) => &hit.id,
            Self::Playlist(hit) => &hit.id,
            Self::Artist(hit) => &hit.id,
        };
        MediaReference::new(self.kind(), id.clone())
    }
}

/// Search results numbered `1..=len()` across type blocks.
///
/// Tracks occupy `1..=track_end`, albums `track_end+1..=album_end`,
/// playlists `album_end+1..=playlist_end` and artists
/// `playlist_end+1..=artist_end`. Every index in `1..=artist_end` maps to
/// exactly one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedSearchIndex {
    tracks: Vec<TrackHit>,
    albums: Vec<AlbumHit>,
    playlists: Vec<PlaylistHit>,
    artists: Vec<ArtistHit>,
    track_end: usize,
    album_end: usize,
    playlist_end: usize,
    artist_end: usize,
}

impl FlattenedSearchIndex {
    /// Builds the index and its block boundaries.
    #[must_use]
    pub fn new(
        tracks: Vec<TrackHit>,
        albums: Vec<AlbumHit>,
        playlists: Vec<PlaylistHit>,
        artists: Vec<ArtistHit>,
    ) -> Self {
        let track_end = tracks.len();
        let album_end = track_end + albums.len();
        let playlist_end = album_end + playlists.len();
        let artist_end = playlist_end + artists.len();
        Self {
            tracks,
            albums,
            playlists,
            artists,
            track_end,
            album_end,
            playlist_end,
            artist_end,
        }
    }

    /// Number of selectable items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artist_end
    }

    /// Whether the search found nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artist_end == 0
    }

    /// Cumulative block ends `(tracks, albums, playlists, artists)`.
    #[must_use]
    pub fn boundaries(&self) -> (usize, usize, usize, usize) {
        (self.track_end, self.album_end, self.playlist_end, self.artist_end)
    }

    /// Track results.
    #[must_use]
    pub fn tracks(&self) -> &[TrackHit] {
        &self.tracks
    }

    /// Album results.
    #[must_use]
    pub fn albums(&self) -> &[AlbumHit] {
        &self.albums
    }

    /// Playlist results.
    #[must_use]
    pub fn playlists(&self) -> &[PlaylistHit] {
        &self.playlists
    }

    /// Artist results.
    #[must_use]
    pub fn artists(&self) -> &[ArtistHit] {
        &self.artists
    }

    /// Maps a 1-based index to its item.
    #[must_use]
    pub fn resolve(&self, index: usize) -> Option<SearchSelection> {
        match index {
            0 => None,
            i if i <= self.track_end => self.tracks.get(i - 1).cloned().map(SearchSelection::Track),
            i if i <= self.album_end => self
                .albums
                .get(i - self.track_end - 1)
                .cloned()
                .map(SearchSelection::Album),
            i if i <= self.playlist_end => self
                .playlists
                .get(i - self.album_end - 1)
                .cloned()
                .map(SearchSelection::Playlist),
            i if i <= self.artist_end => self
                .artists
                .get(i - self.playlist_end - 1)
                .cloned()
                .map(SearchSelection::Artist),
            _ => None,
        }
    }

    /// Resolves indices one by one, in input order.
    ///
    /// Indices outside the index produce [`SelectionError::OutOfRange`]
    /// without affecting the others.
    #[must_use]
    pub fn resolve_all(&self, indices: &[usize]) -> Vec<Result<SearchSelection, SelectionError>> {
        indices
            .iter()
            .map(|&index| {
                self.resolve(index).ok_or(SelectionError::OutOfRange {
                    index,
                    max: self.len(),
                })
            })
            .collect()
    }

    /// Parses user input and resolves every selected index.
    ///
    /// # Errors
    ///
    /// Returns the parse error when the input is malformed as a whole.
    pub fn select(
        &self,
        input: &str,
    ) -> Result<Vec<Result<SearchSelection, SelectionError>>, SelectionError> {
        let indices = parse_selection(input)?;
        Ok(self.resolve_all(&indices))
    }

    /// Every item with its 1-based number, in index order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, SearchSelection)> + '_ {
        (1..=self.len()).filter_map(|index| self.resolve(index).map(|item| (index, item)))
    }
}

/// Runs multi-type searches against the catalog.
#[derive(Debug, Clone)]
pub struct SearchIndexer {
    client: CatalogClient,
    limit: u32,
}

impl SearchIndexer {
    /// Creates an indexer returning up to `limit` results per type.
    #[must_use]
    pub fn new(client: CatalogClient, limit: u32) -> Self {
        Self {
            client,
            limit: limit.clamp(1, MAX_SEARCH_LIMIT),
        }
    }

    /// Per-type result cap.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Searches tracks, albums, playlists and artists in one request.
    ///
    /// Null entries and entries without an id are dropped before numbering.
    ///
    /// # Errors
    ///
    /// Returns the [`CatalogError`] of the search request.
    #[instrument(skip(self))]
    pub async fn search(&self, term: &str) -> Result<FlattenedSearchIndex, CatalogError> {
        let limit = self.limit.to_string();
        let response: SearchResponse = self
            .client
            .get_json(
                "search",
                &[
                    ("q", term),
                    ("type", "track,album,playlist,artist"),
                    ("limit", &limit),
                    ("offset", "0"),
                ],
            )
            .await?;

        let index = index_from_response(response);
        let (tracks, albums, playlists, artists) = index.boundaries();
        debug!(tracks, albums, playlists, artists, "search indexed");
        Ok(index)
    }
}

fn index_from_response(response: SearchResponse) -> FlattenedSearchIndex {
    fn items<T>(page: Option<crate::catalog::dto::Page<Option<T>>>) -> impl Iterator<Item = T> {
        page.map(|p| p.items).unwrap_or_default().into_iter().flatten()
    }

    let tracks = items(response.tracks).filter_map(track_hit).collect();
    let albums = items(response.albums).filter_map(album_hit).collect();
    let playlists = items(response.playlists).filter_map(playlist_hit).collect();
    let artists = items(response.artists).filter_map(artist_hit).collect();
    FlattenedSearchIndex::new(tracks, albums, playlists, artists)
}

fn artist_names(artists: &[crate::catalog::dto::ArtistRefDto]) -> Vec<String> {
    artists
        .iter()
        .filter_map(|a| non_empty(a.name.as_deref()).map(ToString::to_string))
        .collect()
}

fn track_hit(track: TrackDto) -> Option<TrackHit> {
    Some(TrackHit {
        id: non_empty(track.id.as_deref())?.to_string(),
        title: track.name.unwrap_or_default(),
        artists: artist_names(&track.artists),
        explicit: track.explicit.unwrap_or(false),
    })
}

fn album_hit(album: AlbumRefDto) -> Option<AlbumHit> {
    Some(AlbumHit {
        id: non_empty(album.id.as_deref())?.to_string(),
        release_year: release_year(album.release_date.as_deref()),
        artists: artist_names(&album.artists),
        name: album.name.unwrap_or_default(),
        total_tracks: album.total_tracks,
    })
}

fn playlist_hit(playlist: PlaylistDto) -> Option<PlaylistHit> {
    Some(PlaylistHit {
        id: non_empty(playlist.id.as_deref())?.to_string(),
        name: playlist.name.unwrap_or_default(),
        owner: playlist
            .owner
            .and_then(|owner| owner.display_name.or(owner.id)),
    })
}

fn artist_hit(artist: ArtistDto) -> Option<ArtistHit> {
    Some(ArtistHit {
        id: non_empty(artist.id.as_deref())?.to_string(),
        name: artist.name.unwrap_or_default(),
    })
}
