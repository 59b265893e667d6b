//! Media reference recognition from catalog URIs and web links.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

/// Kind of catalog item a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// A single track.
    Track,
    /// An album.
    Album,
    /// A user or editorial playlist.
    Playlist,
    /// A single podcast episode.
    Episode,
    /// A podcast show.
    Show,
    /// An artist.
    Artist,
}

impl MediaKind {
    /// All kinds, in the order they are tried during recognition.
    pub const ALL: [MediaKind; 6] = [
        MediaKind::Track,
        MediaKind::Album,
        MediaKind::Playlist,
        MediaKind::Episode,
        MediaKind::Show,
        MediaKind::Artist,
    ];

    /// Keyword used in URIs and link paths.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Album => "album",
            Self::Playlist => "playlist",
            Self::Episode => "episode",
            Self::Show => "show",
            Self::Artist => "artist",
        }
    }

    /// Parses a URI/link keyword.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == keyword)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed pointer at one catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaReference {
    /// What the id refers to.
    pub kind: MediaKind,
    /// 22-character base-62 catalog id.
    pub id: String,
}

impl MediaReference {
    /// Creates a reference.
    #[must_use]
    pub fn new(kind: MediaKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Canonical URI form (`spotify:kind:id`).
    #[must_use]
    pub fn uri(&self) -> String {
        format!("spotify:{}:{}", self.kind, self.id)
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

#[allow(clippy::expect_used)]
static URI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^spotify:(?P<kind>[a-z]+):(?P<id>[0-9a-zA-Z]{22})$").expect("URI regex is valid")
});

#[allow(clippy::expect_used)]
static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://)?open\.spotify\.com/(?P<kind>[a-z]+)/(?P<id>[0-9a-zA-Z]{22})(?:\?\S*)?$",
    )
    .expect("link regex is valid")
});

/// Resolves user input into a media reference.
///
/// Accepts the canonical URI form (`spotify:track:<id>`) and the web-link form
/// (`https://open.spotify.com/track/<id>?si=...`) for tracks, albums,
/// playlists, episodes, shows and artists. Returns `None` when the input
/// matches none of them, in which case it should be used as a search term.
///
/// # Examples
///
/// ```
/// use tunefetch_core::parser::{MediaKind, resolve_input};
///
/// let link = "https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc";
/// let reference = resolve_input(link).unwrap();
/// assert_eq!(reference.kind, MediaKind::Playlist);
/// assert_eq!(reference.id, "37i9dQZF1DXcBWIGoYBM5M");
/// ```
#[must_use]
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn resolve_input(input: &str) -> Option<MediaReference> {
    let trimmed = input.trim();
    for pattern in [&*URI_PATTERN, &*LINK_PATTERN] {
        let Some(captures) = pattern.captures(trimmed) else {
            continue;
        };
        let keyword = captures.name("kind").map_or("", |m| m.as_str());
        let Some(kind) = MediaKind::from_keyword(keyword) else {
            trace!(keyword, "unknown media kind keyword");
            continue;
        };
        let id = captures.name("id").map_or("", |m| m.as_str());
        debug!(%kind, id, "recognized media reference");
        return Some(MediaReference::new(kind, id));
    }
    trace!("no structural match, treating as search term");
    None
}
