//! Terminal presentation: progress bars, result listings and prompts.

use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use tunefetch_core::catalog::PlaylistInfo;
use tunefetch_core::download::DownloadOutcome;
use tunefetch_core::report::outcome_line;
use tunefetch_core::search::SearchSelection;
use tunefetch_core::{BatchKind, BatchReport, FlattenedSearchIndex, Reporter};

/// Reporter drawing one progress bar per streamed item.
pub(crate) struct ConsoleReporter {
    quiet: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub(crate) fn new(quiet: bool) -> Self {
        Self {
            quiet,
            bar: Mutex::new(None),
        }
    }

    fn clear_bar(&self) {
        if let Ok(mut guard) = self.bar.lock()
            && let Some(bar) = guard.take()
        {
            bar.finish_and_clear();
        }
    }
}

impl Reporter for ConsoleReporter {
    fn batch_started(&self, kind: BatchKind, name: &str) {
        if !self.quiet {
            println!("\n###   {}: {name}   ###", kind.as_str().to_uppercase());
        }
    }

    fn batch_finished(&self, name: &str, report: &BatchReport) {
        if !self.quiet {
            println!(
                "###   FINISHED {name}: {} downloaded, {} skipped, {} failed   ###",
                report.downloaded, report.skipped, report.failed
            );
        }
    }

    fn item_started(&self, label: &str, size_hint: Option<u64>) {
        if self.quiet {
            return;
        }
        let bar = match size_hint {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template("{msg} [{bar:30}] {bytes}/{total_bytes}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template("{spinner} {msg} {bytes}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        bar.set_message(label.to_string());
        if let Ok(mut guard) = self.bar.lock()
            && let Some(previous) = guard.replace(bar)
        {
            previous.finish_and_clear();
        }
    }

    fn item_progress(&self, received: u64) {
        if let Ok(guard) = self.bar.lock()
            && let Some(bar) = guard.as_ref()
        {
            bar.set_position(received);
        }
    }

    fn item_finished(&self, label: &str, outcome: &DownloadOutcome) {
        self.clear_bar();
        if self.quiet && !matches!(outcome, DownloadOutcome::Failed(_)) {
            return;
        }
        println!("{}", outcome_line(label, outcome));
    }

    fn unresolvable(&self, label: &str, reason: &str) {
        if !self.quiet {
            println!("###   SKIPPING: {label} ({reason})   ###");
        }
    }

    fn warning(&self, message: &str) {
        self.clear_bar();
        eprintln!("warning: {message}");
    }
}

/// Prints numbered search results grouped by type.
pub(crate) fn print_search_results(index: &FlattenedSearchIndex) {
    if index.is_empty() {
        println!("NO RESULTS FOUND");
        return;
    }

    let mut current_heading = None;
    for (number, selection) in index.entries() {
        let heading = match &selection {
            SearchSelection::Track(_) => "TRACKS",
            SearchSelection::Album(_) => "ALBUMS",
            SearchSelection::Playlist(_) => "PLAYLISTS",
            SearchSelection::Artist(_) => "ARTISTS",
        };
        if current_heading != Some(heading) {
            println!("\n###  {heading}  ###");
            current_heading = Some(heading);
        }
        println!("{number:>3}  {}", describe(&selection));
    }
    println!();
}

fn describe(selection: &SearchSelection) -> String {
    match selection {
        SearchSelection::Track(hit) => {
            let explicit = if hit.explicit { " [E]" } else { "" };
            format!("{}{explicit} | {}", hit.title, hit.artists.join(", "))
        }
        SearchSelection::Album(hit) => {
            let year = hit.release_year.map_or_else(String::new, |y| format!("({y}) "));
            let total = hit
                .total_tracks
                .map_or_else(String::new, |t| format!(" [{t}]"));
            format!("{year}{}{total} | {}", hit.name, hit.artists.join(", "))
        }
        SearchSelection::Playlist(hit) => match &hit.owner {
            Some(owner) => format!("{} | {owner}", hit.name),
            None => hit.name.clone(),
        },
        SearchSelection::Artist(hit) => hit.name.clone(),
    }
}

/// Prints the user's playlists, numbered from 1.
pub(crate) fn print_playlists(playlists: &[PlaylistInfo]) {
    for (number, playlist) in playlists.iter().enumerate() {
        println!("{:>3}  {}", number + 1, playlist.name);
    }
}

/// Shows `message` and reads one trimmed line from stdin.
pub(crate) fn prompt(message: &str) -> io::Result<String> {
    print!("{message} ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
