//! Tag and cover-art writing for finished audio files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lofty::config::WriteOptions;
use lofty::picture::{Picture, PictureType};
use lofty::prelude::*;
use lofty::read_from_path;
use lofty::tag::Tag;
use tracing::debug;

use super::error::PostProcessError;
use crate::catalog::TrackMetadata;

/// Tags written to every downloaded item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    /// All artists, comma separated.
    pub artist: String,
    /// Track or episode title.
    pub title: String,
    /// Album or show name.
    pub album: String,
    /// Release year.
    pub year: Option<u32>,
    /// Disc number.
    pub disc: Option<u32>,
    /// Track number.
    pub track: Option<u32>,
    /// Catalog identity marker, `id[spotify.com:{kind}:{canonical id}]`.
    pub comment: String,
}

impl TagSet {
    /// Builds the tag set of one item.
    #[must_use]
    pub fn from_metadata(metadata: &TrackMetadata) -> Self {
        Self {
            artist: metadata.joined_artists(),
            title: metadata.title.clone(),
            album: metadata.album_name.clone(),
            year: metadata.release_year,
            disc: metadata.disc_number,
            track: metadata.track_number,
            comment: format!(
                "id[spotify.com:{}:{}]",
                metadata.kind.as_str(),
                metadata.canonical_id
            ),
        }
    }
}

/// Writes tags and cover art into audio files.
#[async_trait]
pub trait MetadataWriter: Send + Sync {
    /// Writes `tags` into the file at `path`.
    async fn write_tags(&self, path: &Path, tags: &TagSet) -> Result<(), PostProcessError>;

    /// Embeds `image` as the front cover of the file at `path`.
    async fn embed_artwork(&self, path: &Path, image: Vec<u8>) -> Result<(), PostProcessError>;
}

/// [`MetadataWriter`] backed by `lofty`.
///
/// The blocking file work runs on tokio's blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyMetadataWriter;

#[async_trait]
impl MetadataWriter for LoftyMetadataWriter {
    async fn write_tags(&self, path: &Path, tags: &TagSet) -> Result<(), PostProcessError> {
        let path = path.to_path_buf();
        let tags = tags.clone();
        run_blocking(path.clone(), move || write_tags_blocking(&path, &tags)).await
    }

    async fn embed_artwork(&self, path: &Path, image: Vec<u8>) -> Result<(), PostProcessError> {
        let path = path.to_path_buf();
        run_blocking(path.clone(), move || embed_artwork_blocking(&path, &image)).await
    }
}

async fn run_blocking<F>(path: PathBuf, job: F) -> Result<(), PostProcessError>
where
    F: FnOnce() -> Result<(), PostProcessError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| PostProcessError::tagging(path, e))?
}

fn load_tag(path: &Path) -> Result<Tag, PostProcessError> {
    let tagged_file = read_from_path(path).map_err(|e| PostProcessError::tagging(path, e))?;
    Ok(tagged_file
        .primary_tag()
        .cloned()
        .unwrap_or_else(|| Tag::new(tagged_file.primary_tag_type())))
}

fn write_tags_blocking(path: &Path, tags: &TagSet) -> Result<(), PostProcessError> {
    let mut tag = load_tag(path)?;
    tag.set_artist(tags.artist.clone());
    tag.set_title(tags.title.clone());
    tag.set_album(tags.album.clone());
    tag.set_comment(tags.comment.clone());
    if let Some(year) = tags.year {
        tag.set_year(year);
    }
    if let Some(disc) = tags.disc {
        tag.set_disk(disc);
    }
    if let Some(track) = tags.track {
        tag.set_track(track);
    }
    tag.save_to_path(path, WriteOptions::default())
        .map_err(|e| PostProcessError::tagging(path, e))?;
    debug!(path = %path.display(), "tags written");
    Ok(())
}

fn embed_artwork_blocking(path: &Path, image: &[u8]) -> Result<(), PostProcessError> {
    let mut picture =
        Picture::from_reader(&mut &image[..]).map_err(|e| PostProcessError::tagging(path, e))?;
    picture.set_pic_type(PictureType::CoverFront);

    let mut tag = load_tag(path)?;
    tag.remove_picture_type(PictureType::CoverFront);
    tag.push_picture(picture);
    tag.save_to_path(path, WriteOptions::default())
        .map_err(|e| PostProcessError::tagging(path, e))?;
    debug!(path = %path.display(), bytes = image.len(), "artwork embedded");
    Ok(())
}
