//! Binary entrypoint for the photo gallery.
//!
//! Runs a gallery against the configured endpoint with a simulated viewport
//! that scrolls to the bottom after every render, then writes the final grid.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use photo_gallery::config::{ACCESS_KEY_ENV, Configuration};
use photo_gallery::events::GalleryCommand;
use photo_gallery::state::GalleryPhase;
use photo_gallery::tasks::fetcher::UnsplashSource;
use photo_gallery::tasks::gallery::{self, Frame, GalleryOptions};
use photo_gallery::viewport::{TileLayout, Viewport};

#[derive(Debug, Parser)]
#[command(
    name = "photo-gallery",
    version,
    about = "Infinite-scrolling photo gallery"
)]
struct Args {
    /// Path to YAML config; defaults apply when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Keep scrolling until this many pages have been requested
    #[arg(long, value_name = "N", default_value_t = 3)]
    pages: u32,
    /// Retries allowed when the first page fails
    #[arg(long, value_name = "N", default_value_t = 1)]
    initial_retries: u32,
    /// Write the final grid as HTML here instead of stdout
    #[arg(long, value_name = "FILE")]
    html_out: Option<PathBuf>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(format!("photo_gallery={level}").parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let cfg = match &args.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    }
    .validated()
    .context("invalid configuration values")?;

    if cfg.resolve_access_key().is_none() {
        return Err(anyhow!(
            "no access key: set access-key in the config or {ACCESS_KEY_ENV}"
        ));
    }
    let source = Arc::new(UnsplashSource::from_config(&cfg)?);
    info!(endpoint = %source.endpoint(), per_page = cfg.per_page, "starting gallery");

    let opts = GalleryOptions::from(&cfg);
    let viewport = Viewport::new(16);
    let (command_tx, command_rx) = mpsc::channel::<GalleryCommand>(4);
    let (surface_tx, surface_rx) = gallery::surface(&opts);
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; shutting down");
            cancel.cancel();
        });
    }

    let handle = tokio::spawn(gallery::run(
        source,
        viewport.subscribe(),
        command_rx,
        surface_tx,
        cancel.clone(),
        opts,
    ));

    let last = scroll_through(
        &viewport,
        surface_rx,
        &command_tx,
        &cancel,
        args.pages,
        args.initial_retries,
    )
    .await;
    cancel.cancel();

    let state = handle.await.context("gallery task panicked")??;
    if !state.failed_pages().is_empty() {
        warn!(pages = ?state.failed_pages(), "some pages could not be loaded");
    }
    info!(
        photos = state.photos().len(),
        page = state.page(),
        "gallery finished"
    );

    let html = last?.view.to_html();
    match &args.html_out {
        Some(path) => std::fs::write(path, html)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{html}"),
    }
    Ok(())
}

/// Plays the part of a user: scrolls to the bottom whenever the gallery is
/// idle until `pages` pages were requested.
async fn scroll_through(
    viewport: &Viewport,
    mut frames: watch::Receiver<Frame>,
    commands: &mpsc::Sender<GalleryCommand>,
    cancel: &CancellationToken,
    pages: u32,
    mut initial_retries: u32,
) -> Result<Frame> {
    let layout = TileLayout::default();
    let max_scrolls = pages.saturating_mul(3);
    let mut scrolls = 0;
    loop {
        let frame = frames.borrow_and_update().clone();
        match frame.phase {
            GalleryPhase::InitialFailed if initial_retries > 0 => {
                initial_retries -= 1;
                commands
                    .send(GalleryCommand::RetryInitial)
                    .await
                    .map_err(|_| anyhow!("gallery stopped accepting commands"))?;
            }
            GalleryPhase::InitialFailed => return Ok(frame),
            GalleryPhase::LoadedIdle if frame.page >= pages => return Ok(frame),
            GalleryPhase::LoadedIdle if scrolls >= max_scrolls => {
                warn!(scrolls, "giving up before reaching the requested page");
                return Ok(frame);
            }
            GalleryPhase::LoadedIdle => {
                scrolls += 1;
                viewport.publish(layout.at_bottom(&frame.view));
            }
            GalleryPhase::InitialLoading | GalleryPhase::LoadingMore => {}
        }
        tokio::select! {
            _ = cancel.cancelled() => return Ok(frame),
            changed = frames.changed() => {
                changed.context("gallery stopped publishing")?;
            }
        }
    }
}
