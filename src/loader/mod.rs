//! Image acquisition boundary
//!
//! The compositor only knows the `ImageLoader` trait; the production
//! implementation is a rate-limited HTTP client that decodes data URLs
//! locally, fetches http(s) URLs directly first, and retries once through
//! the configured CORS proxy when the direct fetch fails. Photo hosts are
//! shared across a whole batch, so fetches flow through a governor rate
//! limiter with bounded exponential-backoff retries.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{
    clock::DefaultClock, middleware::NoOpMiddleware, state::InMemoryState, state::NotKeyed, Quota,
    RateLimiter,
};
use image::{DynamicImage, GenericImageView};
use nonzero_ext::nonzero;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::assets::{self, AssetError};
use crate::config::FetchSettings;

/// `encodeURIComponent`-equivalent escape set
const URL_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Image loading errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} fetching {url}")]
    Status { status: u16, url: String },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("invalid asset: {0}")]
    Asset(#[from] AssetError),
    #[error("all fetch attempts failed for {url}")]
    Exhausted { url: String },
}

/// Capability of turning a URL (or embedded data) into a decoded raster.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, src: &str) -> Result<DynamicImage, LoadError>;
}

/// Rate-limited HTTP image loader with direct-then-proxy fallback.
pub struct HttpImageLoader {
    client: reqwest::Client,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>,
    proxy_base: Option<String>,
    max_retries: u32,
}

impl HttpImageLoader {
    pub fn new(settings: &FetchSettings) -> Self {
        let rate = NonZeroU32::new(settings.rate_limit_per_minute).unwrap_or(nonzero!(1u32));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .user_agent(concat!("flyergen/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        HttpImageLoader {
            client,
            limiter: RateLimiter::direct(Quota::per_minute(rate)),
            proxy_base: settings.proxy_base.clone(),
            max_retries: settings.max_retries,
        }
    }

    /// Build the proxied form of a URL, if this source should be proxied.
    ///
    /// Data URLs never hit the network, and localhost sources are reachable
    /// without a proxy; everything else http(s) goes through
    /// `{proxy_base}{percent-encoded url}`.
    fn proxied_url(&self, src: &str) -> Option<String> {
        let base = self.proxy_base.as_ref()?;
        let parsed = Url::parse(src).ok()?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return None;
        }
        match parsed.host_str() {
            Some("localhost") | Some("127.0.0.1") | None => return None,
            Some(_) => {}
        }
        Some(format!("{}{}", base, utf8_percent_encode(src, URL_COMPONENT)))
    }

    async fn fetch_once(&self, url: &str) -> Result<DynamicImage, LoadError> {
        self.limiter.until_ready().await;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(LoadError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        let image = image::load_from_memory(&bytes)?;

        debug!(url = %url, width = image.width(), height = image.height(), "Fetched image");
        Ok(image)
    }

    /// Fetch with bounded retries and exponential backoff.
    async fn fetch_with_retry(&self, url: &str) -> Result<DynamicImage, LoadError> {
        let mut backoff = Duration::from_millis(500);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(attempt, backoff_ms = backoff.as_millis() as u64, "Retrying image fetch");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(Duration::from_secs(30));
            }

            match self.fetch_once(url).await {
                Ok(image) => return Ok(image),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| LoadError::Exhausted {
            url: url.to_string(),
        }))
    }
}

#[async_trait]
impl ImageLoader for HttpImageLoader {
    async fn load(&self, src: &str) -> Result<DynamicImage, LoadError> {
        if src.starts_with("data:") {
            return Ok(assets::decode_data_url(src)?);
        }

        match self.fetch_with_retry(src).await {
            Ok(image) => Ok(image),
            Err(direct_err) => match self.proxied_url(src) {
                Some(proxied) => {
                    warn!(url = %src, error = %direct_err, "Direct fetch failed, retrying through proxy");
                    self.fetch_with_retry(&proxied).await
                }
                None => Err(direct_err),
            },
        }
    }
}
