use std::sync::Arc;

use anyhow::Result;
use tokio::select;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Configuration, FailurePolicy};
use crate::events::{GalleryCommand, PageFetched, ViewportMetrics};
use crate::render::{GridView, RenderOptions, render};
use crate::state::{GalleryPhase, GalleryState, PhaseChange};
use crate::tasks::fetcher::{InFlight, PhotoSource, spawn_fetch};
use crate::tasks::pager::{Pager, PagerDecision};

#[derive(Debug, Clone, Copy)]
pub struct GalleryOptions {
    pub per_page: u32,
    pub scroll_threshold_px: f64,
    pub failure_policy: FailurePolicy,
    pub render: RenderOptions,
}

impl Default for GalleryOptions {
    fn default() -> Self {
        Self::from(&Configuration::default())
    }
}

impl From<&Configuration> for GalleryOptions {
    fn from(cfg: &Configuration) -> Self {
        Self {
            per_page: cfg.per_page,
            scroll_threshold_px: cfg.scroll_threshold_px,
            failure_policy: cfg.failure_policy,
            render: RenderOptions {
                initial_placeholders: cfg.initial_placeholders,
                per_page: cfg.per_page as usize,
                columns: cfg.columns,
            },
        }
    }
}

/// Published to the rendering surface after every state change.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub page: u32,
    pub photo_count: usize,
    pub loading: bool,
    pub initial_load: bool,
    pub phase: GalleryPhase,
    pub failed_pages: Vec<u32>,
    pub view: GridView,
}

impl Frame {
    pub fn capture(state: &GalleryState, opts: &RenderOptions) -> Self {
        Self {
            page: state.page(),
            photo_count: state.photos().len(),
            loading: state.loading(),
            initial_load: state.initial_load(),
            phase: state.phase(),
            failed_pages: state.failed_pages().to_vec(),
            view: render(state, opts),
        }
    }
}

/// Surface channel seeded with the frame of a freshly mounted gallery.
pub fn surface(opts: &GalleryOptions) -> (watch::Sender<Frame>, watch::Receiver<Frame>) {
    watch::channel(Frame::capture(&GalleryState::new(), &opts.render))
}

struct Gallery<S> {
    source: Arc<S>,
    opts: GalleryOptions,
    pager: Pager,
    state: GalleryState,
    in_flight: Option<InFlight>,
    done_tx: mpsc::Sender<PageFetched>,
    surface: watch::Sender<Frame>,
    cancel: CancellationToken,
}

impl<S: PhotoSource> Gallery<S> {
    fn start_fetch(&mut self) {
        let page = self.state.page();
        if let Some(stale) = self.in_flight.take() {
            debug!(page = stale.page(), "abandoning superseded fetch");
            stale.abort();
        }
        debug!(page, per_page = self.opts.per_page, "fetching photos");
        let change = self.state.begin_fetch();
        log_change(change);
        self.in_flight = Some(spawn_fetch(
            Arc::clone(&self.source),
            page,
            self.opts.per_page,
            self.done_tx.clone(),
            &self.cancel,
        ));
    }

    fn on_scroll(&mut self, metrics: ViewportMetrics) -> bool {
        match self.pager.on_scroll(&metrics, &mut self.state) {
            PagerDecision::Stay => false,
            PagerDecision::Advance(page) => {
                debug!(page, "scrolled near bottom; advancing");
                self.start_fetch();
                true
            }
            PagerDecision::Retry(page) => {
                info!(page, "retrying failed page");
                self.start_fetch();
                true
            }
        }
    }

    fn on_fetched(&mut self, PageFetched { page, result }: PageFetched) -> bool {
        match self.in_flight.as_ref() {
            Some(current) if current.page() == page && page == self.state.page() => {}
            _ => {
                debug!(page, "discarding result for a fetch no longer in flight");
                return false;
            }
        }
        self.in_flight = None;

        let change = match result {
            Ok(batch) => {
                info!(page, count = batch.len(), "loaded photos");
                self.state.complete_fetch(batch)
            }
            Err(err) => {
                warn!(page, error = %err, "failed to fetch photos");
                let change = self.state.fail_fetch();
                if self.state.phase() == GalleryPhase::InitialFailed {
                    warn!("first page failed; waiting for a retry request");
                } else if self.opts.failure_policy == FailurePolicy::SkipPage {
                    warn!(page, "page will be skipped on the next scroll");
                }
                change
            }
        };
        log_change(change);
        true
    }

    fn on_command(&mut self, cmd: GalleryCommand) -> bool {
        match cmd {
            GalleryCommand::RetryInitial if self.state.phase() == GalleryPhase::InitialFailed => {
                info!("retrying first page");
                self.start_fetch();
                true
            }
            GalleryCommand::RetryInitial => {
                debug!(phase = ?self.state.phase(), "ignoring retry request");
                false
            }
        }
    }

    fn publish(&self) {
        self.surface
            .send_replace(Frame::capture(&self.state, &self.opts.render));
    }

    fn teardown(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            debug!(page = in_flight.page(), "aborting in-flight fetch");
            in_flight.abort();
            log_change(self.state.abandon_fetch());
        }
    }
}

fn log_change(change: Option<PhaseChange>) {
    if let Some(PhaseChange { from, to }) = change {
        debug!(?from, ?to, "gallery phase changed");
    }
}

/// Drives one gallery from mount to teardown.
///
/// Fetches page 1 immediately, then reacts to scroll signals, fetch results
/// and control commands one at a time. Returns the final state once
/// `cancel` fires or the viewport goes away; the scroll subscription and any
/// in-flight request are released on the way out.
pub async fn run<S: PhotoSource>(
    source: Arc<S>,
    mut scroll_rx: broadcast::Receiver<ViewportMetrics>,
    mut commands: mpsc::Receiver<GalleryCommand>,
    surface: watch::Sender<Frame>,
    cancel: CancellationToken,
    opts: GalleryOptions,
) -> Result<GalleryState> {
    let (done_tx, mut done_rx) = mpsc::channel::<PageFetched>(4);
    let mut gallery = Gallery {
        source,
        opts,
        pager: Pager::new(opts.scroll_threshold_px, opts.failure_policy),
        state: GalleryState::new(),
        in_flight: None,
        done_tx,
        surface,
        cancel: cancel.clone(),
    };

    gallery.start_fetch();
    gallery.publish();

    loop {
        let changed = select! {
            _ = cancel.cancelled() => break,

            Some(fetched) = done_rx.recv() => gallery.on_fetched(fetched),

            scroll = scroll_rx.recv() => match scroll {
                Ok(metrics) => gallery.on_scroll(metrics),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "scroll listener lagged");
                    false
                }
                Err(RecvError::Closed) => {
                    debug!("viewport closed; unmounting gallery");
                    break;
                }
            },

            Some(cmd) = commands.recv() => gallery.on_command(cmd),
        };
        if changed {
            gallery.publish();
        }
    }

    drop(scroll_rx);
    gallery.teardown();
    gallery.publish();
    Ok(gallery.state)
}
