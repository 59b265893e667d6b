//! CLI argument definitions using clap derive macros.

use std::ffi::OsString;

use clap::{Parser, Subcommand};

/// Download tracks, albums, playlists, podcasts and discographies from the
/// music catalog as tagged audio files.
///
/// Pass a catalog URI (`spotify:album:<id>`), a web link
/// (`https://open.spotify.com/track/<id>`) or free text to search for.
#[derive(Parser, Debug)]
#[command(name = "tunefetch")]
#[command(author, version, about)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Catalog URI, web link or search text
    #[arg(value_name = "INPUT")]
    pub input: Vec<String>,

    /// Choose from your playlists and download the selection
    #[arg(short = 'p', long)]
    pub playlist: bool,

    /// Download your saved tracks (also accepted as -ls)
    #[arg(long = "liked-songs")]
    pub liked_songs: bool,

    /// Start the web interface
    #[arg(short = 'w', long)]
    pub web: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Search tracks, albums, playlists and artists and pick what to download
    Search {
        /// Search terms
        #[arg(required = true, num_args = 1..)]
        term: Vec<String>,
    },
}

/// Rewrites the historical `-ls` spelling to `--liked-songs`.
///
/// clap would otherwise read `-ls` as the short flags `-l` and `-s`.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            if arg == "-ls" {
                OsString::from("--liked-songs")
            } else {
                arg
            }
        })
        .collect()
}
