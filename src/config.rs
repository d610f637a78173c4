use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Environment variable consulted when no `access-key` is configured.
pub const ACCESS_KEY_ENV: &str = "UNSPLASH_ACCESS_KEY";

/// Largest page size the collection endpoint accepts.
const MAX_PER_PAGE: u32 = 30;

/// What the gallery does with a page whose fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Leave a gap: the next scroll requests the following page.
    #[default]
    SkipPage,
    /// The next scroll requests the failed page again.
    RetryPage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    /// Base URL of the collection API; `/photos` is appended.
    #[serde(default = "Configuration::default_api_base_url")]
    pub api_base_url: String,
    /// Client credential. Falls back to `UNSPLASH_ACCESS_KEY` when absent.
    #[serde(default)]
    pub access_key: Option<String>,
    /// Photos requested per page.
    #[serde(default = "Configuration::default_per_page")]
    pub per_page: u32,
    /// Placeholder blocks shown while the first page loads.
    #[serde(default = "Configuration::default_initial_placeholders")]
    pub initial_placeholders: usize,
    /// Distance from the document end that counts as "near the bottom".
    #[serde(default = "Configuration::default_scroll_threshold_px")]
    pub scroll_threshold_px: f64,
    /// Columns of the rendered grid.
    #[serde(default = "Configuration::default_columns")]
    pub columns: usize,
    /// Optional per-request timeout; requests never time out when unset.
    #[serde(default, with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
    /// Whether a failed page is skipped or requested again on the next scroll.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Configuration {
    fn default_api_base_url() -> String {
        "https://api.unsplash.com".to_string()
    }

    const fn default_per_page() -> u32 {
        10
    }

    const fn default_initial_placeholders() -> usize {
        20
    }

    const fn default_scroll_threshold_px() -> f64 {
        200.0
    }

    const fn default_columns() -> usize {
        5
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            (1..=MAX_PER_PAGE).contains(&self.per_page),
            "per-page must be between 1 and {MAX_PER_PAGE}"
        );
        ensure!(self.columns > 0, "columns must be greater than zero");
        ensure!(
            self.initial_placeholders > 0,
            "initial-placeholders must be greater than zero"
        );
        ensure!(
            self.scroll_threshold_px.is_finite() && self.scroll_threshold_px >= 0.0,
            "scroll-threshold-px must be a non-negative number"
        );
        ensure!(
            !self.api_base_url.trim().is_empty(),
            "api-base-url must not be empty"
        );
        reqwest::Url::parse(&self.api_base_url)
            .with_context(|| format!("api-base-url {:?} is not a URL", self.api_base_url))?;
        if let Some(timeout) = self.request_timeout {
            ensure!(!timeout.is_zero(), "request-timeout must be positive");
        }
        Ok(self)
    }

    /// The configured key, or the one provided through the environment.
    pub fn resolve_access_key(&self) -> Option<String> {
        self.resolve_access_key_with(|name| std::env::var(name).ok())
    }

    /// Like [`Self::resolve_access_key`], reading variables through `lookup`.
    /// Blank keys count as absent.
    pub fn resolve_access_key_with(
        &self,
        lookup: impl FnOnce(&str) -> Option<String>,
    ) -> Option<String> {
        self.access_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| lookup(ACCESS_KEY_ENV))
            .filter(|key| !key.trim().is_empty())
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            api_base_url: Self::default_api_base_url(),
            access_key: None,
            per_page: Self::default_per_page(),
            initial_placeholders: Self::default_initial_placeholders(),
            scroll_threshold_px: Self::default_scroll_threshold_px(),
            columns: Self::default_columns(),
            request_timeout: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}
