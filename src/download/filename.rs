//! File naming for downloaded items and their staging files.
//!
//! The naming scheme is an on-disk compatibility contract with earlier
//! output trees:
//!
//! `{primary artist} - {album or show} - [{NN}. ]{title}.{ext}`
//!
//! where the `NN.` ordinal is present only for items downloaded as part of
//! an album.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::constants::{PART_SUFFIX, RAW_SUFFIX, STAGING_INFIX};
use crate::catalog::TrackMetadata;

/// Stem used for staging files when the target has no file name.
const FALLBACK_STEM: &str = "download";

/// Makes one path component safe for common filesystems.
///
/// Removes `\ / : * ? ' < > "`, replaces `|` with `-`, drops control
/// characters and trims surrounding whitespace. Dots and empty results are
/// kept as they are so names match files written by earlier runs.
#[must_use]
pub fn sanitize_component(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter_map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '\'' | '<' | '>' | '"' => None,
            '|' => Some('-'),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();

    cleaned.trim().to_string()
}

/// File name of one track or episode.
#[must_use]
pub fn item_file_name(metadata: &TrackMetadata, ordinal: Option<u32>, extension: &str) -> String {
    let artist = sanitize_component(metadata.primary_artist());
    let album = sanitize_component(&metadata.album_name);
    let title = sanitize_component(&metadata.title);
    let extension = extension.trim_start_matches('.');
    match ordinal {
        Some(n) => format!("{artist} - {album} - {n:02}. {title}.{extension}"),
        None => format!("{artist} - {album} - {title}.{extension}"),
    }
}

/// Sub-folder of one disc of a multi-disc album.
#[must_use]
pub fn disc_folder_name(disc: u32) -> String {
    format!("CD {disc:02}")
}

/// File the stream is written to while it is still incomplete.
#[must_use]
pub fn part_path(target: &Path) -> PathBuf {
    with_appended_suffix(target, PART_SUFFIX)
}

/// Complete, not yet post-processed stream.
#[must_use]
pub fn raw_path(target: &Path) -> PathBuf {
    with_appended_suffix(target, RAW_SUFFIX)
}

/// Transcoder output, renamed onto the target once tagged.
///
/// Keeps the target's extension so the transcoder infers the container.
#[must_use]
pub fn staging_path(target: &Path) -> PathBuf {
    let mut name: OsString = target
        .file_stem()
        .map_or_else(|| FALLBACK_STEM.into(), ToOwned::to_owned);
    name.push(".");
    name.push(STAGING_INFIX);
    if let Some(extension) = target.extension() {
        name.push(".");
        name.push(extension);
    }
    target.with_file_name(name)
}

fn with_appended_suffix(target: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = target
        .file_name()
        .map_or_else(|| FALLBACK_STEM.into(), ToOwned::to_owned);
    name.push(".");
    name.push(suffix);
    target.with_file_name(name)
}
