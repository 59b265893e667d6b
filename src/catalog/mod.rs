//! Catalog access: HTTP client, paginated traversal and metadata.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tunefetch_core::catalog::{CatalogClient, MetadataFetcher};
//! use tunefetch_core::session::{AccountTier, StaticTokenSession};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Arc::new(StaticTokenSession::new("token", AccountTier::Premium)?);
//! let fetcher = MetadataFetcher::new(CatalogClient::new(session)?);
//! let track = fetcher.fetch_track("4uLU6hMCjMI75M1A2tKUQC").await?;
//! println!("{} ({})", track.label(), track.canonical_id);
//! # Ok(())
//! # }
//! ```

mod client;
pub mod dto;
mod error;
mod metadata;
mod paginator;

pub use client::{CatalogClient, DEFAULT_BASE_URL, DEFAULT_MARKET};
pub use error::CatalogError;
pub use metadata::{
    ALBUM_TRACKS_PAGE_SIZE, ARTIST_ALBUMS_PAGE_SIZE, AlbumMetadata, AlbumTrack, ArtistAlbum,
    ArtistInfo, CollectionEntry, DiscGroup, LIBRARY_PAGE_SIZE, MetadataFetcher, MetadataSource,
    PLAYLIST_TRACKS_PAGE_SIZE, PlaylistInfo, ShowInfo, TrackMetadata,
};
pub use paginator::{CollectionPaginator, PageSource, PaginationCursor};
