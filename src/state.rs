use crate::events::PhotoRecord;

/// Coarse lifecycle of the gallery, derived from [`GalleryState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryPhase {
    InitialLoading,
    InitialFailed,
    LoadedIdle,
    LoadingMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: GalleryPhase,
    pub to: GalleryPhase,
}

/// Everything the gallery knows. Owned by exactly one task.
///
/// `photos` only ever grows, and `initial_load` flips to false once, on the
/// first successful page.
#[derive(Debug, Clone)]
pub struct GalleryState {
    page: u32,
    photos: Vec<PhotoRecord>,
    loading: bool,
    initial_load: bool,
    initial_failed: bool,
    last_failed: Option<u32>,
    failed_pages: Vec<u32>,
}

impl Default for GalleryState {
    fn default() -> Self {
        Self::new()
    }
}

impl GalleryState {
    pub fn new() -> Self {
        Self {
            page: 1,
            photos: Vec::new(),
            loading: false,
            initial_load: true,
            initial_failed: false,
            last_failed: None,
            failed_pages: Vec::new(),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn photos(&self) -> &[PhotoRecord] {
        &self.photos
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn initial_load(&self) -> bool {
        self.initial_load
    }

    /// Pages whose fetch failed and were never filled in.
    pub fn failed_pages(&self) -> &[u32] {
        &self.failed_pages
    }

    /// True when the most recent completed fetch was for the current page and failed.
    pub fn current_page_failed(&self) -> bool {
        self.last_failed == Some(self.page)
    }

    pub fn phase(&self) -> GalleryPhase {
        match (self.initial_load, self.loading) {
            (true, false) if self.initial_failed => GalleryPhase::InitialFailed,
            (true, _) => GalleryPhase::InitialLoading,
            (false, true) => GalleryPhase::LoadingMore,
            (false, false) => GalleryPhase::LoadedIdle,
        }
    }

    /// Move to the next page. Returns the new page number.
    pub fn advance_page(&mut self) -> u32 {
        self.page = self.page.saturating_add(1);
        self.page
    }

    /// Mark a fetch for the current page as in flight.
    pub fn begin_fetch(&mut self) -> Option<PhaseChange> {
        let from = self.phase();
        self.loading = true;
        self.initial_failed = false;
        self.changed(from)
    }

    /// Append a fetched batch and clear the loading flag.
    pub fn complete_fetch(&mut self, batch: Vec<PhotoRecord>) -> Option<PhaseChange> {
        let from = self.phase();
        self.photos.extend(batch);
        if self.last_failed == Some(self.page) {
            self.last_failed = None;
            self.failed_pages.retain(|p| *p != self.page);
        }
        self.initial_load = false;
        self.loading = false;
        self.changed(from)
    }

    /// Record a failed fetch for the current page; nothing is appended and
    /// the page counter stays where it is.
    pub fn fail_fetch(&mut self) -> Option<PhaseChange> {
        let from = self.phase();
        if !self.failed_pages.contains(&self.page) {
            self.failed_pages.push(self.page);
        }
        self.last_failed = Some(self.page);
        if self.initial_load {
            self.initial_failed = true;
        }
        self.loading = false;
        self.changed(from)
    }

    /// Clear the loading flag for a fetch that was abandoned before it resolved.
    pub fn abandon_fetch(&mut self) -> Option<PhaseChange> {
        let from = self.phase();
        self.loading = false;
        self.changed(from)
    }

    fn changed(&self, from: GalleryPhase) -> Option<PhaseChange> {
        let to = self.phase();
        (from != to).then_some(PhaseChange { from, to })
    }
}
