use crate::config::FailurePolicy;
use crate::events::ViewportMetrics;
use crate::state::{GalleryPhase, GalleryState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerDecision {
    /// Nothing to do for this scroll.
    Stay,
    /// The page counter moved to this page; fetch it.
    Advance(u32),
    /// Fetch the current (previously failed) page again.
    Retry(u32),
}

/// Decides when scrolling asks for more data.
///
/// The pager keeps no copy of the loading flag: it reads the state it is
/// handed, which is always the live state owned by the gallery loop.
#[derive(Debug, Clone, Copy)]
pub struct Pager {
    threshold_px: f64,
    policy: FailurePolicy,
}

impl Pager {
    pub fn new(threshold_px: f64, policy: FailurePolicy) -> Self {
        Self {
            threshold_px,
            policy,
        }
    }

    pub fn on_scroll(&self, metrics: &ViewportMetrics, state: &mut GalleryState) -> PagerDecision {
        if !metrics.near_bottom(self.threshold_px) || state.loading() {
            return PagerDecision::Stay;
        }
        if state.phase() == GalleryPhase::InitialFailed {
            return PagerDecision::Stay;
        }
        if self.policy == FailurePolicy::RetryPage && state.current_page_failed() {
            return PagerDecision::Retry(state.page());
        }
        PagerDecision::Advance(state.advance_page())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEAR: ViewportMetrics = ViewportMetrics {
        scroll_offset: 1150.0,
        viewport_height: 800.0,
        document_height: 2100.0,
    };
    const FAR: ViewportMetrics = ViewportMetrics {
        scroll_offset: 0.0,
        viewport_height: 800.0,
        document_height: 2100.0,
    };

    fn loaded() -> GalleryState {
        let mut state = GalleryState::new();
        state.begin_fetch();
        state.complete_fetch(Vec::new());
        state
    }

    #[test]
    fn far_from_bottom_never_moves() {
        let pager = Pager::new(200.0, FailurePolicy::SkipPage);
        let mut state = loaded();
        for _ in 0..5 {
            assert_eq!(pager.on_scroll(&FAR, &mut state), PagerDecision::Stay);
        }
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn near_bottom_advances_once_while_loading() {
        let pager = Pager::new(200.0, FailurePolicy::SkipPage);
        let mut state = loaded();
        assert_eq!(pager.on_scroll(&NEAR, &mut state), PagerDecision::Advance(2));
        state.begin_fetch();
        assert_eq!(pager.on_scroll(&NEAR, &mut state), PagerDecision::Stay);
        assert_eq!(pager.on_scroll(&NEAR, &mut state), PagerDecision::Stay);
        assert_eq!(state.page(), 2);
    }

    #[test]
    fn skip_policy_moves_past_failed_page() {
        let pager = Pager::new(200.0, FailurePolicy::SkipPage);
        let mut state = loaded();
        pager.on_scroll(&NEAR, &mut state);
        state.begin_fetch();
        state.fail_fetch();
        assert_eq!(pager.on_scroll(&NEAR, &mut state), PagerDecision::Advance(3));
        assert_eq!(state.failed_pages(), &[2]);
    }

    #[test]
    fn retry_policy_requests_failed_page_again() {
        let pager = Pager::new(200.0, FailurePolicy::RetryPage);
        let mut state = loaded();
        pager.on_scroll(&NEAR, &mut state);
        state.begin_fetch();
        state.fail_fetch();
        assert_eq!(pager.on_scroll(&NEAR, &mut state), PagerDecision::Retry(2));
        assert_eq!(state.page(), 2);
    }

    #[test]
    fn failed_first_page_ignores_scrolling() {
        let pager = Pager::new(200.0, FailurePolicy::SkipPage);
        let mut state = GalleryState::new();
        state.begin_fetch();
        state.fail_fetch();
        assert_eq!(pager.on_scroll(&NEAR, &mut state), PagerDecision::Stay);
        assert_eq!(state.page(), 1);
    }
}
