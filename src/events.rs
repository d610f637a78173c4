use serde::Deserialize;

use crate::error::FetchError;

/// Image variants offered by the collection endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhotoUrls {
    pub small: String,
    pub regular: String,
    pub full: String,
}

/// One photo as returned by the collection endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhotoRecord {
    #[serde(default)]
    pub alt_description: Option<String>,
    pub urls: PhotoUrls,
}

/// Scroll position snapshot delivered by the viewport on every scroll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    pub scroll_offset: f64,
    pub viewport_height: f64,
    pub document_height: f64,
}

impl ViewportMetrics {
    /// True when the bottom edge of the viewport is within `threshold_px`
    /// of the end of the document.
    pub fn near_bottom(&self, threshold_px: f64) -> bool {
        self.viewport_height + self.scroll_offset >= self.document_height - threshold_px
    }
}

/// Sent by a fetch task back to the gallery loop.
#[derive(Debug)]
pub struct PageFetched {
    pub page: u32,
    pub result: Result<Vec<PhotoRecord>, FetchError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryCommand {
    /// Re-issue the fetch for the first page after it failed.
    RetryInitial,
}
