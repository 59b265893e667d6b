//! Offset/limit traversal of paginated catalog collections.
//!
//! A [`CollectionPaginator`] requests pages `(offset, limit)` starting at
//! offset 0 and advancing by `limit`, until a page comes back shorter than
//! `limit` (an empty final page included). A failed page request aborts the
//! traversal with [`CatalogError::PaginationAborted`], so an incomplete
//! collection is never mistaken for an exhausted one. The paginator cannot be
//! restarted: after completion or abort, it yields nothing further.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;
use futures_util::stream;
use tracing::{debug, instrument, warn};

use super::error::CatalogError;

/// Position of the next page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    /// Index of the first item of the page.
    pub offset: u32,
    /// Requested page size.
    pub limit: u32,
}

/// A paginated endpoint.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Short description used in logs and errors (usually the endpoint path).
    fn describe(&self) -> String;

    /// Fetches the items of one page.
    async fn fetch_page(&self, cursor: PaginationCursor) -> Result<Vec<T>, CatalogError>;
}

#[derive(Debug)]
enum TraversalState {
    Active,
    Complete,
    Aborted {
        offset: u32,
        source: Arc<CatalogError>,
    },
}

/// Lazy, finite, non-restartable traversal of one paginated collection.
pub struct CollectionPaginator<T> {
    source: Box<dyn PageSource<T>>,
    cursor: PaginationCursor,
    state: TraversalState,
    items_yielded: usize,
    pages_fetched: u32,
}

impl<T: Send + 'static> CollectionPaginator<T> {
    /// Creates a paginator over `source` with page size `limit` (at least 1).
    #[must_use]
    pub fn new(source: impl PageSource<T> + 'static, limit: u32) -> Self {
        Self {
            source: Box::new(source),
            cursor: PaginationCursor {
                offset: 0,
                limit: limit.max(1),
            },
            state: TraversalState::Active,
            items_yielded: 0,
            pages_fetched: 0,
        }
    }

    /// Items handed out so far.
    #[must_use]
    pub fn items_yielded(&self) -> usize {
        self.items_yielded
    }

    /// Page requests issued so far.
    #[must_use]
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Whether the collection was traversed to its end.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.state, TraversalState::Complete)
    }

    /// Fetches the next page.
    ///
    /// Returns `Ok(None)` once the collection is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::PaginationAborted`] when a page request fails,
    /// and again on every later call.
    #[instrument(skip(self), fields(endpoint = %self.source.describe(), offset = self.cursor.offset))]
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>, CatalogError> {
        match &self.state {
            TraversalState::Complete => return Ok(None),
            TraversalState::Aborted { offset, source } => {
                return Err(self.aborted_error(*offset, Arc::clone(source)));
            }
            TraversalState::Active => {}
        }

        self.pages_fetched += 1;
        let page = match self.source.fetch_page(self.cursor).await {
            Ok(page) => page,
            Err(error) => {
                let source = Arc::new(error);
                let offset = self.cursor.offset;
                warn!(
                    offset,
                    items_yielded = self.items_yielded,
                    error = %source,
                    "page request failed, traversal aborted"
                );
                self.state = TraversalState::Aborted {
                    offset,
                    source: Arc::clone(&source),
                };
                return Err(self.aborted_error(offset, source));
            }
        };

        let returned = page.len();
        debug!(returned, limit = self.cursor.limit, "page received");
        if returned < self.cursor.limit as usize {
            self.state = TraversalState::Complete;
        }
        self.cursor.offset = self.cursor.offset.saturating_add(self.cursor.limit);
        self.items_yielded += returned;

        if page.is_empty() {
            Ok(None)
        } else {
            Ok(Some(page))
        }
    }

    /// Drains the traversal into one vector.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::PaginationAborted`] if any page request fails;
    /// partial results are discarded rather than returned as complete.
    pub async fn collect_all(mut self) -> Result<Vec<T>, CatalogError> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page);
        }
        Ok(items)
    }

    /// Converts the traversal into a stream of individual items.
    ///
    /// The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<T, CatalogError>> + Send {
        stream::unfold(
            Some((self, VecDeque::new())),
            |state| async move {
                let (mut paginator, mut buffer) = state?;
                loop {
                    if let Some(item) = buffer.pop_front() {
                        return Some((Ok(item), Some((paginator, buffer))));
                    }
                    match paginator.next_page().await {
                        Ok(Some(page)) => buffer.extend(page),
                        Ok(None) => return None,
                        Err(error) => return Some((Err(error), None)),
                    }
                }
            },
        )
    }

    fn aborted_error(&self, offset: u32, source: Arc<CatalogError>) -> CatalogError {
        CatalogError::PaginationAborted {
            endpoint: self.source.describe(),
            offset,
            items_yielded: self.items_yielded,
            source,
        }
    }
}

impl<T> std::fmt::Debug for CollectionPaginator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionPaginator")
            .field("endpoint", &self.source.describe())
            .field("cursor", &self.cursor)
            .field("state", &self.state)
            .field("items_yielded", &self.items_yielded)
            .finish_non_exhaustive()
    }
}
