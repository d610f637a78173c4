use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Url;
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::Configuration;
use crate::error::FetchError;
use crate::events::{PageFetched, PhotoRecord};

/// A paginated collection of photos.
pub trait PhotoSource: Send + Sync + 'static {
    fn fetch_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Vec<PhotoRecord>, FetchError>> + Send;
}

/// `GET {base}/photos?page=&per_page=&client_id=` against an Unsplash-style API.
#[derive(Debug, Clone)]
pub struct UnsplashSource {
    client: reqwest::Client,
    endpoint: Url,
    access_key: Option<String>,
}

impl UnsplashSource {
    pub fn new(
        api_base_url: &str,
        access_key: Option<String>,
        timeout: Option<std::time::Duration>,
    ) -> Result<Self> {
        let endpoint = format!("{}/photos", api_base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&endpoint)
            .with_context(|| format!("invalid photo endpoint {endpoint}"))?;
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            access_key,
        })
    }

    pub fn from_config(cfg: &Configuration) -> Result<Self> {
        Self::new(
            &cfg.api_base_url,
            cfg.resolve_access_key(),
            cfg.request_timeout,
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl PhotoSource for UnsplashSource {
    fn fetch_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Vec<PhotoRecord>, FetchError>> + Send {
        let request = self.access_key.as_ref().map(|key| {
            self.client
                .get(self.endpoint.clone())
                .query(&[
                    ("page", page.to_string()),
                    ("per_page", per_page.to_string()),
                    ("client_id", key.clone()),
                ])
                .header("Accept-Version", "v1")
        });
        async move {
            let request = request.ok_or(FetchError::MissingCredential)?;
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status { status, page });
            }
            let body = response.bytes().await?;
            let photos: Vec<PhotoRecord> = serde_json::from_slice(&body)?;
            trace!(page, count = photos.len(), "decoded photo page");
            Ok(photos)
        }
    }
}

/// Handle to a fetch running in the background.
#[derive(Debug)]
pub struct InFlight {
    page: u32,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl InFlight {
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Stop the request; any result it would have produced is never delivered.
    pub fn abort(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Fetch `page` on a separate task and report the outcome on `done`.
pub fn spawn_fetch<S: PhotoSource>(
    source: Arc<S>,
    page: u32,
    per_page: u32,
    done: Sender<PageFetched>,
    cancel: &CancellationToken,
) -> InFlight {
    let cancel = cancel.child_token();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            select! {
                _ = cancel.cancelled() => {
                    debug!(page, "fetch cancelled");
                }
                result = source.fetch_page(page, per_page) => {
                    if done.send(PageFetched { page, result }).await.is_err() {
                        debug!(page, "gallery gone; dropping fetched page");
                    }
                }
            }
        }
    });
    InFlight {
        page,
        cancel,
        handle,
    }
}
