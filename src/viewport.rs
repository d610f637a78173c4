use tokio::sync::broadcast;
use tracing::trace;

use crate::events::ViewportMetrics;
use crate::render::GridView;

/// Scroll signal shared between the surface and any gallery listening to it.
///
/// Subscribers are plain `broadcast::Receiver`s; dropping one unsubscribes it.
#[derive(Debug, Clone)]
pub struct Viewport {
    tx: broadcast::Sender<ViewportMetrics>,
}

impl Viewport {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewportMetrics> {
        self.tx.subscribe()
    }

    /// Deliver a scroll notification. Returns how many listeners saw it.
    pub fn publish(&self, metrics: ViewportMetrics) -> usize {
        match self.tx.send(metrics) {
            Ok(n) => n,
            Err(_) => {
                trace!("scroll signal dropped: no listeners");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Fixed tile geometry used to estimate how tall a rendered grid is.
#[derive(Debug, Clone, Copy)]
pub struct TileLayout {
    pub tile_height: f64,
    pub gap: f64,
    pub viewport_height: f64,
}

impl Default for TileLayout {
    fn default() -> Self {
        Self {
            tile_height: 300.0,
            gap: 16.0,
            viewport_height: 900.0,
        }
    }
}

impl TileLayout {
    pub fn document_height(&self, view: &GridView) -> f64 {
        let rows = view.rows() as f64;
        let footer = if view.indicator.is_some() { 96.0 } else { 0.0 };
        (rows * (self.tile_height + self.gap) + footer).max(self.viewport_height)
    }

    /// Metrics for a viewport scrolled all the way down.
    pub fn at_bottom(&self, view: &GridView) -> ViewportMetrics {
        let document_height = self.document_height(view);
        ViewportMetrics {
            scroll_offset: document_height - self.viewport_height,
            viewport_height: self.viewport_height,
            document_height,
        }
    }

    /// Metrics for a viewport resting at the top of the document.
    #[cfg(test)]
    fn at_top(&self, view: &GridView) -> ViewportMetrics {
        ViewportMetrics {
            scroll_offset: 0.0,
            viewport_height: self.viewport_height,
            document_height: self.document_height(view),
        }
    }
}
