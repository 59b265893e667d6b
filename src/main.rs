//! CLI entry point for tunefetch.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info, warn};
use tunefetch_core::download::{CommandContentFeeder, FfmpegTranscoder};
use tunefetch_core::{
    AppConfig, BatchOrchestrator, BatchReport, CatalogClient, DownloadPipeline, MetadataFetcher,
    OrchestratorError, SearchIndexer, StaticTokenSession, resolve_input,
};

mod cli;
mod console;

use cli::{Args, Command};
use console::ConsoleReporter;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse_from(cli::normalize_args(std::env::args_os()));

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn,
    // since the console reporter already prints per-item lines)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    if args.web {
        println!("web interface is not implemented");
        return Ok(());
    }

    if dotenv::dotenv().is_ok() {
        debug!("loaded .env file");
    }
    let config = AppConfig::from_env().context("invalid configuration")?;
    let app = App::build(&config, args.quiet)?;

    let result = if let Some(Command::Search { term }) = &args.command {
        app.search(&term.join(" ")).await
    } else if args.playlist {
        app.user_playlists().await
    } else if args.liked_songs {
        app.orchestrator.download_liked_songs().await.map(Some)
    } else {
        let input = if args.input.is_empty() {
            console::prompt("Enter search or URL:")?
        } else {
            args.input.join(" ")
        };
        if input.is_empty() {
            info!("nothing to do");
            return Ok(());
        }
        app.dispatch(&input).await
    };

    match result {
        Ok(Some(report)) => {
            info!(
                downloaded = report.downloaded,
                skipped = report.skipped,
                failed = report.failed,
                unresolvable = report.unresolvable,
                "run complete"
            );
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(OrchestratorError::Fatal { source }) => {
            Err(anyhow::Error::new(source).context("download aborted"))
        }
        Err(error) => {
            warn!(error = %error, "batch incomplete");
            eprintln!("{error}");
            Ok(())
        }
    }
}

/// Wired-up components of one run.
struct App {
    orchestrator: BatchOrchestrator,
    indexer: SearchIndexer,
}

impl App {
    fn build(config: &AppConfig, quiet: bool) -> Result<Self> {
        let token = config
            .access_token
            .clone()
            .context("TUNEFETCH_ACCESS_TOKEN is not set")?;
        let session = Arc::new(StaticTokenSession::new(token, config.account_type)?);

        let rate_gate = Arc::new(config.rate_gate());
        let client = CatalogClient::with_timeouts(
            session,
            config.catalog_base_url.clone(),
            config.http_connect_timeout_secs,
            config.http_read_timeout_secs,
        )?
        .with_market(config.market.clone())
        .with_retry_policy(config.catalog_retry_policy())
        .with_rate_gate(Arc::clone(&rate_gate));

        let Some(feeder_command) = config.content_feeder_command.as_deref() else {
            bail!("TUNEFETCH_CONTENT_FEEDER_COMMAND is not set");
        };
        let feeder = CommandContentFeeder::from_command_line(feeder_command)?;

        let reporter = Arc::new(ConsoleReporter::new(quiet));
        let fetcher = MetadataFetcher::new(client.clone());
        let pipeline = DownloadPipeline::new(
            Arc::new(fetcher.clone()),
            Arc::new(feeder),
            config.pipeline_settings(),
            rate_gate,
        )
        .with_transcoder(Arc::new(FfmpegTranscoder::new(&config.ffmpeg_path)))
        .with_stream_retry(config.stream_retry_policy())
        .with_reporter(reporter.clone());

        Ok(Self {
            orchestrator: BatchOrchestrator::new(fetcher, pipeline).with_reporter(reporter),
            indexer: SearchIndexer::new(client, config.search_result_limit),
        })
    }

    /// Downloads a URI or link, or searches for anything else.
    async fn dispatch(&self, input: &str) -> Result<Option<BatchReport>, OrchestratorError> {
        match resolve_input(input) {
            Some(reference) => self.orchestrator.download_reference(&reference).await.map(Some),
            None => self.search(input).await,
        }
    }

    async fn search(&self, term: &str) -> Result<Option<BatchReport>, OrchestratorError> {
        let index = match self.indexer.search(term).await {
            Ok(index) => index,
            Err(error) if error.is_fatal() => {
                return Err(OrchestratorError::from_catalog(error, BatchReport::default()));
            }
            Err(error) => {
                eprintln!("search failed: {error}");
                return Ok(None);
            }
        };

        console::print_search_results(&index);
        if index.is_empty() {
            return Ok(None);
        }

        let selection = console::prompt("SELECT ITEM(S) BY ID:").unwrap_or_default();
        let resolved = index.select(&selection)?;

        let mut report = BatchReport::default();
        for item in resolved {
            match item {
                Ok(selection) => {
                    let item_report = self.orchestrator.download_search_selection(&selection).await?;
                    report.merge(&item_report);
                }
                Err(error) => {
                    eprintln!("{error}");
                    report.unresolvable += 1;
                }
            }
        }
        Ok(Some(report))
    }

    async fn user_playlists(&self) -> Result<Option<BatchReport>, OrchestratorError> {
        let playlists = self
            .orchestrator
            .fetcher()
            .fetch_user_playlists()
            .await
            .map_err(|error| OrchestratorError::from_catalog(error, BatchReport::default()))?;
        if playlists.is_empty() {
            println!("NO PLAYLISTS FOUND");
            return Ok(None);
        }

        console::print_playlists(&playlists);
        let selection = console::prompt("SELECT PLAYLIST(S) BY ID:").unwrap_or_default();
        self.orchestrator
            .download_selected_playlists(&playlists, &selection)
            .await
            .map(Some)
    }
}
