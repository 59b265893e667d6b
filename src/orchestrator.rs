//! Batch downloads over albums, discographies, playlists, shows and the
//! saved-tracks library.
//!
//! Items are processed one after another. A failing item is counted and the
//! batch moves on; an authorization failure or an aborted collection listing
//! ends the batch and is returned to the caller.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::catalog::dto::{EpisodeDto, PlaylistItemDto, non_empty};
use crate::catalog::{
    CatalogError, CollectionEntry, CollectionPaginator, MetadataFetcher, PlaylistInfo,
};
use crate::download::filename::{disc_folder_name, sanitize_component};
use crate::download::{DownloadOutcome, DownloadPipeline, DownloadTask, PipelineError};
use crate::parser::{MediaKind, MediaReference, SelectionError, parse_selection};
use crate::report::{BatchKind, Reporter, TracingReporter};
use crate::search::SearchSelection;

/// Folder of the saved-tracks library.
pub const LIKED_SONGS_DIR: &str = "Liked Songs";

/// Which releases of an artist are downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtistScope {
    /// Every release the catalog lists for the artist.
    All,
    /// Only non-single releases whose primary artist is the artist.
    PrimaryNonSingles,
}

/// Outcome counts of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Items written in this run.
    pub downloaded: usize,
    /// Items skipped (existing, unavailable, not found).
    pub skipped: usize,
    /// Items that failed.
    pub failed: usize,
    /// Collection entries that could not be turned into a download at all.
    pub unresolvable: usize,
}

impl BatchReport {
    /// Counts one outcome.
    pub fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded { .. } => self.downloaded += 1,
            DownloadOutcome::Skipped(_) => self.skipped += 1,
            DownloadOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Adds the counts of a nested batch.
    pub fn merge(&mut self, other: &Self) {
        self.downloaded += other.downloaded;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.unresolvable += other.unresolvable;
    }

    /// Number of entries seen.
    #[must_use]
    pub fn total(&self) -> usize {
        self.downloaded + self.skipped + self.failed + self.unresolvable
    }
}

/// Errors that end a batch.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The session is unusable; nothing further can be downloaded.
    #[error("{source}")]
    Fatal {
        /// The underlying pipeline error.
        #[from]
        source: PipelineError,
    },

    /// A collection could not be listed completely.
    #[error("batch stopped after {} of its entries: {source}", .processed.total())]
    Catalog {
        /// The catalog error.
        #[source]
        source: CatalogError,
        /// What was processed before the batch stopped.
        processed: BatchReport,
    },

    /// The playlist selection could not be parsed.
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

impl OrchestratorError {
    /// Classifies a catalog error: authorization problems are fatal, anything
    /// else stops only the current batch.
    #[must_use]
    pub fn from_catalog(source: CatalogError, processed: BatchReport) -> Self {
        if source.is_fatal() {
            Self::Fatal {
                source: PipelineError::Authorization { source },
            }
        } else {
            Self::Catalog { source, processed }
        }
    }
}

/// Composes the pipeline over collections.
pub struct BatchOrchestrator {
    fetcher: MetadataFetcher,
    pipeline: DownloadPipeline,
    reporter: Arc<dyn Reporter>,
}

impl BatchOrchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(fetcher: MetadataFetcher, pipeline: DownloadPipeline) -> Self {
        Self {
            fetcher,
            pipeline,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Sets the reporter for batch-level events.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Metadata fetcher used for collection listings.
    #[must_use]
    pub fn fetcher(&self) -> &MetadataFetcher {
        &self.fetcher
    }

    /// Downloads whatever a reference points at.
    ///
    /// Artist references download the complete discography.
    ///
    /// # Errors
    ///
    /// See [`OrchestratorError`].
    #[instrument(skip(self), fields(reference = %reference))]
    pub async fn download_reference(
        &self,
        reference: &MediaReference,
    ) -> Result<BatchReport, OrchestratorError> {
        match reference.kind {
            MediaKind::Track | MediaKind::Episode => self.download_single(reference.clone()).await,
            MediaKind::Album => self.download_album(&reference.id).await,
            MediaKind::Playlist => self.download_playlist(&reference.id).await,
            MediaKind::Show => self.download_show(&reference.id).await,
            MediaKind::Artist => self.download_artist(&reference.id, ArtistScope::All).await,
        }
    }

    /// Downloads one chosen search result.
    ///
    /// Artists chosen from a search skip singles and releases led by other artists.
    ///
    /// # Errors
    ///
    /// See [`OrchestratorError`].
    pub async fn download_search_selection(
        &self,
        selection: &SearchSelection,
    ) -> Result<BatchReport, OrchestratorError> {
        match selection {
            SearchSelection::Track(hit) => {
                self.download_single(MediaReference::new(MediaKind::Track, hit.id.clone()))
                    .await
            }
            SearchSelection::Album(hit) => self.download_album(&hit.id).await,
            SearchSelection::Playlist(hit) => self.download_playlist(&hit.id).await,
            SearchSelection::Artist(hit) => {
                self.download_artist(&hit.id, ArtistScope::PrimaryNonSingles)
                    .await
            }
        }
    }

    /// Downloads one track or episode directly under its root.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Fatal`] on authorization failure.
    pub async fn download_single(
        &self,
        reference: MediaReference,
    ) -> Result<BatchReport, OrchestratorError> {
        let mut report = BatchReport::default();
        let outcome = self.pipeline.process(DownloadTask::new(reference)).await?;
        report.record(&outcome);
        Ok(report)
    }

    /// Downloads an album into `{artist}/{album}/`, one `CD NN` folder per
    /// disc when the album has several, each file prefixed by its track number.
    ///
    /// # Errors
    ///
    /// See [`OrchestratorError`].
    #[instrument(skip(self))]
    pub async fn download_album(&self, id: &str) -> Result<BatchReport, OrchestratorError> {
        let mut report = BatchReport::default();
        let album = match self.fetcher.fetch_album(id).await {
            Ok(album) => album,
            Err(error) if error.is_not_found() => {
                self.reporter
                    .unresolvable(&format!("album {id}"), &error.to_string());
                report.unresolvable += 1;
                return Ok(report);
            }
            Err(error) => return Err(OrchestratorError::from_catalog(error, report)),
        };

        self.reporter.batch_started(BatchKind::Album, &album.name);
        if album.unavailable > 0 {
            self.reporter.unresolvable(
                &format!("{} entries of album {}", album.unavailable, album.name),
                "removed from the catalog",
            );
            report.unresolvable += album.unavailable;
        }
        let album_dir = PathBuf::from(sanitize_component(&album.primary_artist))
            .join(sanitize_component(&album.name));

        for group in album.disc_groups() {
            let dir = match group.disc {
                Some(disc) => album_dir.join(disc_folder_name(disc)),
                None => album_dir.clone(),
            };
            for track in group.tracks {
                let task = DownloadTask::new(MediaReference::new(MediaKind::Track, track.id))
                    .in_dir(dir.clone())
                    .with_ordinal(track.track_number);
                let outcome = self.pipeline.process(task).await?;
                report.record(&outcome);
            }
        }

        self.reporter.batch_finished(&album.name, &report);
        Ok(report)
    }

    /// Downloads an artist's releases album by album, with the longer batch
    /// wait after each album.
    ///
    /// # Errors
    ///
    /// See [`OrchestratorError`].
    #[instrument(skip(self))]
    pub async fn download_artist(
        &self,
        id: &str,
        scope: ArtistScope,
    ) -> Result<BatchReport, OrchestratorError> {
        let mut report = BatchReport::default();
        let artist = match self.fetcher.fetch_artist(id).await {
            Ok(artist) => artist,
            Err(error) if error.is_not_found() => {
                self.reporter
                    .unresolvable(&format!("artist {id}"), &error.to_string());
                report.unresolvable += 1;
                return Ok(report);
            }
            Err(error) => return Err(OrchestratorError::from_catalog(error, report)),
        };
        let albums = self
            .fetcher
            .fetch_artist_albums(id)
            .await
            .map_err(|error| OrchestratorError::from_catalog(error, report))?;

        let selected: Vec<_> = albums
            .into_iter()
            .filter(|album| match scope {
                ArtistScope::All => true,
                ArtistScope::PrimaryNonSingles => {
                    !album.is_single() && album.is_primary_artist(&artist.id)
                }
            })
            .collect();
        info!(artist = %artist.name, albums = selected.len(), "downloading discography");
        self.reporter.batch_started(BatchKind::Artist, &artist.name);

        for album in &selected {
            match self.download_album(&album.id).await {
                Ok(album_report) => report.merge(&album_report),
                Err(OrchestratorError::Catalog { source, processed }) => {
                    report.merge(&processed);
                    return Err(OrchestratorError::Catalog {
                        source,
                        processed: report,
                    });
                }
                Err(error) => return Err(error),
            }
            self.pipeline.rate_gate().pause_between_batches().await;
        }

        self.reporter.batch_finished(&artist.name, &report);
        Ok(report)
    }

    /// Downloads a playlist into a folder named after it.
    ///
    /// # Errors
    ///
    /// See [`OrchestratorError`].
    #[instrument(skip(self))]
    pub async fn download_playlist(&self, id: &str) -> Result<BatchReport, OrchestratorError> {
        let playlist = match self.fetcher.fetch_playlist(id).await {
            Ok(playlist) => playlist,
            Err(error) if error.is_not_found() => {
                self.reporter
                    .unresolvable(&format!("playlist {id}"), &error.to_string());
                return Ok(BatchReport {
                    unresolvable: 1,
                    ..BatchReport::default()
                });
            }
            Err(error) => {
                return Err(OrchestratorError::from_catalog(error, BatchReport::default()));
            }
        };
        self.download_playlist_info(&playlist).await
    }

    async fn download_playlist_info(
        &self,
        playlist: &PlaylistInfo,
    ) -> Result<BatchReport, OrchestratorError> {
        self.download_entries(
            BatchKind::Playlist,
            &playlist.name,
            PathBuf::from(sanitize_component(&playlist.name)),
            self.fetcher.playlist_entries(&playlist.id),
        )
        .await
    }

    /// Downloads the saved-tracks library into `Liked Songs/`.
    ///
    /// # Errors
    ///
    /// See [`OrchestratorError`].
    #[instrument(skip(self))]
    pub async fn download_liked_songs(&self) -> Result<BatchReport, OrchestratorError> {
        self.download_entries(
            BatchKind::Library,
            LIKED_SONGS_DIR,
            PathBuf::from(LIKED_SONGS_DIR),
            self.fetcher.saved_track_entries(),
        )
        .await
    }

    /// Lists the user's playlists and downloads the selected ones.
    ///
    /// # Errors
    ///
    /// See [`OrchestratorError`].
    pub async fn download_user_playlists(
        &self,
        selection: &str,
    ) -> Result<BatchReport, OrchestratorError> {
        let playlists = self
            .fetcher
            .fetch_user_playlists()
            .await
            .map_err(|error| OrchestratorError::from_catalog(error, BatchReport::default()))?;
        self.download_selected_playlists(&playlists, selection)
            .await
    }

    /// Downloads the playlists picked by a 1-based selection from `playlists`.
    ///
    /// Out-of-range numbers are reported and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Selection`] for malformed input, or a
    /// batch error from one of the playlists.
    pub async fn download_selected_playlists(
        &self,
        playlists: &[PlaylistInfo],
        selection: &str,
    ) -> Result<BatchReport, OrchestratorError> {
        let indices = parse_selection(selection)?;
        let mut report = BatchReport::default();
        for index in indices {
            let Some(playlist) = index.checked_sub(1).and_then(|i| playlists.get(i)) else {
                let error = SelectionError::OutOfRange {
                    index,
                    max: playlists.len(),
                };
                self.reporter
                    .unresolvable(&format!("playlist #{index}"), &error.to_string());
                report.unresolvable += 1;
                continue;
            };
            match self.download_playlist_info(playlist).await {
                Ok(playlist_report) => report.merge(&playlist_report),
                Err(OrchestratorError::Catalog { source, processed }) => {
                    report.merge(&processed);
                    return Err(OrchestratorError::Catalog {
                        source,
                        processed: report,
                    });
                }
                Err(error) => return Err(error),
            }
        }
        Ok(report)
    }

    /// Downloads every episode of a show into `{podcast root}/{show}/`.
    ///
    /// # Errors
    ///
    /// See [`OrchestratorError`].
    #[instrument(skip(self))]
    pub async fn download_show(&self, id: &str) -> Result<BatchReport, OrchestratorError> {
        let mut report = BatchReport::default();
        let show = match self.fetcher.fetch_show(id).await {
            Ok(show) => show,
            Err(error) if error.is_not_found() => {
                self.reporter
                    .unresolvable(&format!("show {id}"), &error.to_string());
                report.unresolvable += 1;
                return Ok(report);
            }
            Err(error) => return Err(OrchestratorError::from_catalog(error, report)),
        };

        self.reporter.batch_started(BatchKind::Show, &show.name);
        let dir = PathBuf::from(sanitize_component(&show.name));
        let mut episodes: CollectionPaginator<Option<EpisodeDto>> = self.fetcher.show_episodes(id);

        loop {
            let page = match episodes.next_page().await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(error) => {
                    self.reporter.batch_finished(&show.name, &report);
                    return Err(OrchestratorError::from_catalog(error, report));
                }
            };
            for episode in page {
                let Some(episode_id) = episode
                    .as_ref()
                    .and_then(|e| non_empty(e.id.as_deref()))
                    .map(ToString::to_string)
                else {
                    self.reporter.unresolvable("episode", "removed from the catalog");
                    report.unresolvable += 1;
                    continue;
                };
                let task = DownloadTask::new(MediaReference::new(MediaKind::Episode, episode_id))
                    .in_dir(dir.clone());
                let outcome = self.pipeline.process(task).await?;
                report.record(&outcome);
            }
        }

        self.reporter.batch_finished(&show.name, &report);
        Ok(report)
    }

    /// Downloads the track entries of a playlist-like collection, page by page.
    async fn download_entries(
        &self,
        kind: BatchKind,
        name: &str,
        dir: PathBuf,
        mut entries: CollectionPaginator<PlaylistItemDto>,
    ) -> Result<BatchReport, OrchestratorError> {
        let mut report = BatchReport::default();
        self.reporter.batch_started(kind, name);

        loop {
            let page = match entries.next_page().await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(error) => {
                    self.reporter.batch_finished(name, &report);
                    return Err(OrchestratorError::from_catalog(error, report));
                }
            };
            for item in &page {
                let entry = CollectionEntry::from_item(item);
                let Some(id) = entry.id else {
                    self.reporter
                        .unresolvable(&entry.label, "not downloadable (removed or local file)");
                    report.unresolvable += 1;
                    continue;
                };
                let task =
                    DownloadTask::new(MediaReference::new(MediaKind::Track, id)).in_dir(dir.clone());
                let outcome = self.pipeline.process(task).await?;
                report.record(&outcome);
            }
        }

        debug!(name, pages = entries.pages_fetched(), "collection traversed");
        self.reporter.batch_finished(name, &report);
        Ok(report)
    }
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("fetcher", &self.fetcher)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::{DownloadError, SkipReason, StreamError};

    #[test]
    fn test_batch_report_counts_outcomes() {
        let mut report = BatchReport::default();
        report.record(&DownloadOutcome::Downloaded {
            path: PathBuf::from("a"),
        });
        report.record(&DownloadOutcome::Skipped(SkipReason::AlreadyExists));
        report.record(&DownloadOutcome::Failed(DownloadError::StreamExhausted {
            id: "x".to_string(),
            attempts: 3,
            source: StreamError::feeder("boom"),
        }));

        assert_eq!(report.downloaded, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn test_merge_adds_counts() {
        let mut total = BatchReport {
            downloaded: 1,
            ..BatchReport::default()
        };
        total.merge(&BatchReport {
            downloaded: 2,
            unresolvable: 1,
            ..BatchReport::default()
        });
        assert_eq!(total.downloaded, 3);
        assert_eq!(total.unresolvable, 1);
    }

    #[test]
    fn test_fatal_catalog_errors_become_fatal() {
        let error = OrchestratorError::from_catalog(
            CatalogError::InsufficientScope {
                url: "me/tracks".to_string(),
            },
            BatchReport::default(),
        );
        assert!(matches!(error, OrchestratorError::Fatal { .. }));

        let error = OrchestratorError::from_catalog(
            CatalogError::Timeout {
                url: "x".to_string(),
            },
            BatchReport::default(),
        );
        assert!(matches!(error, OrchestratorError::Catalog { .. }));
    }
}
