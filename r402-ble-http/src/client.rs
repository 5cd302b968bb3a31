//! A [`Facilitator`] that talks to a _remote_ x402 facilitator over HTTP.
//!
//! [`FacilitatorClient`] handles the `/verify`, `/settle` and `/supported`
//! endpoints with JSON bodies. Custom headers and a per-request timeout are
//! optional; `/supported` responses are cached for a configurable TTL.
//!
//! ## Error Handling
//!
//! [`FacilitatorClientError`] captures where a request failed:
//! - URL construction
//! - HTTP transport failures
//! - JSON deserialization errors
//! - Unexpected HTTP status responses

use std::fmt::Display;
use std::time::{Duration, Instant};

use http::{HeaderMap, StatusCode};
use r402_ble::Facilitator;
use r402_ble::proto::{
    SettleRequest, SettleResponse, SupportedResponse, VerifyRequest, VerifyResponse,
};
use reqwest::Client;
use tokio::sync::RwLock;
use url::Url;

use crate::constants::{SETTLE_PATH, SUPPORTED_PATH, VERIFY_PATH};

#[cfg(feature = "telemetry")]
use tracing::{Instrument, Span, instrument};

#[derive(Clone, Debug)]
struct SupportedCacheState {
    response: SupportedResponse,
    expires_at: Instant,
}

/// TTL cache for the `/supported` endpoint response.
///
/// Each clone starts empty.
#[derive(Debug)]
pub struct SupportedCache {
    ttl: Duration,
    state: RwLock<Option<SupportedCacheState>>,
}

impl SupportedCache {
    /// Creates an empty cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(None),
        }
    }

    /// Returns the cached response if it has not expired.
    pub async fn get(&self) -> Option<SupportedResponse> {
        let guard = self.state.read().await;
        let cache = guard.as_ref()?;
        (Instant::now() < cache.expires_at).then(|| cache.response.clone())
    }

    /// Stores a response for the configured TTL.
    pub async fn set(&self, response: SupportedResponse) {
        *self.state.write().await = Some(SupportedCacheState {
            response,
            expires_at: Instant::now() + self.ttl,
        });
    }

    /// How long a response stays fresh.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drops any cached response.
    pub async fn clear(&self) {
        *self.state.write().await = None;
    }
}

impl Clone for SupportedCache {
    fn clone(&self) -> Self {
        Self::new(self.ttl)
    }
}

/// Errors that can occur while talking to a remote facilitator.
#[derive(Debug, thiserror::Error)]
pub enum FacilitatorClientError {
    /// URL parse error.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// HTTP transport error, including timeouts.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The response body was not the expected JSON.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The facilitator answered with a status other than 200.
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The response body.
        body: String,
    },
    /// The response body could not be read.
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}

/// A client for a remote x402 facilitator.
#[derive(Clone, Debug)]
pub struct FacilitatorClient {
    base_url: Url,
    verify_url: Url,
    settle_url: Url,
    supported_url: Url,
    client: Client,
    headers: HeaderMap,
    timeout: Option<Duration>,
    supported_cache: SupportedCache,
}

impl FacilitatorClient {
    /// Default TTL for the `/supported` cache (10 minutes).
    pub const DEFAULT_SUPPORTED_CACHE_TTL: Duration = Duration::from_secs(600);

    /// The facilitator base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The resolved `./verify` URL.
    #[must_use]
    pub const fn verify_url(&self) -> &Url {
        &self.verify_url
    }

    /// The resolved `./settle` URL.
    #[must_use]
    pub const fn settle_url(&self) -> &Url {
        &self.settle_url
    }

    /// The resolved `./supported` URL.
    #[must_use]
    pub const fn supported_url(&self) -> &Url {
        &self.supported_url
    }

    /// The configured request timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// How long `/supported` responses are cached.
    #[must_use]
    pub const fn supported_cache_ttl(&self) -> Duration {
        self.supported_cache.ttl()
    }

    /// Creates a client for the facilitator at `base_url`.
    ///
    /// Endpoint URLs are resolved relative to the base, so the base should
    /// end with a `/`.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError::UrlParse`] if an endpoint URL cannot
    /// be built.
    pub fn try_new(base_url: Url) -> Result<Self, FacilitatorClientError> {
        let join = |path: &str, context: &'static str| {
            base_url
                .join(path)
                .map_err(|source| FacilitatorClientError::UrlParse { context, source })
        };
        let verify_url = join(VERIFY_PATH, "Failed to construct ./verify URL")?;
        let settle_url = join(SETTLE_PATH, "Failed to construct ./settle URL")?;
        let supported_url = join(SUPPORTED_PATH, "Failed to construct ./supported URL")?;
        Ok(Self {
            client: Client::new(),
            base_url,
            verify_url,
            settle_url,
            supported_url,
            headers: HeaderMap::new(),
            timeout: None,
            supported_cache: SupportedCache::new(Self::DEFAULT_SUPPORTED_CACHE_TTL),
        })
    }

    /// Sends `headers` with every request.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Applies `timeout` to every request.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the `/supported` cache TTL. [`Duration::ZERO`] disables caching.
    #[must_use]
    pub fn with_supported_cache_ttl(mut self, ttl: Duration) -> Self {
        self.supported_cache = SupportedCache::new(ttl);
        self
    }

    /// Sends `POST /verify`.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError`] if the request fails or the
    /// facilitator does not answer 200 with a verify response.
    pub async fn verify(
        &self,
        request: &VerifyRequest,
    ) -> Result<VerifyResponse, FacilitatorClientError> {
        self.post_json(&self.verify_url, "POST /verify", request)
            .await
    }

    /// Sends `POST /settle`.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError`] if the request fails or the
    /// facilitator does not answer 200 with a settle response.
    pub async fn settle(
        &self,
        request: &SettleRequest,
    ) -> Result<SettleResponse, FacilitatorClientError> {
        self.post_json(&self.settle_url, "POST /settle", request)
            .await
    }

    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "x402.facilitator_client.supported", skip_all, err)
    )]
    async fn supported_inner(&self) -> Result<SupportedResponse, FacilitatorClientError> {
        self.get_json(&self.supported_url, "GET /supported").await
    }

    /// Fetches `GET /supported`, served from cache while it is fresh.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError`] if the request fails.
    pub async fn supported(&self) -> Result<SupportedResponse, FacilitatorClientError> {
        if let Some(response) = self.supported_cache.get().await {
            return Ok(response);
        }

        #[cfg(feature = "telemetry")]
        tracing::info!("x402.facilitator_client.supported_cache_miss");

        let response = self.supported_inner().await?;
        self.supported_cache.set(response.clone()).await;
        Ok(response)
    }

    async fn post_json<T, R>(
        &self,
        url: &Url,
        context: &'static str,
        payload: &T,
    ) -> Result<R, FacilitatorClientError>
    where
        T: serde::Serialize + Sync + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let req = self.client.post(url.clone()).json(payload);
        self.send(req, context).await
    }

    async fn get_json<R>(
        &self,
        url: &Url,
        context: &'static str,
    ) -> Result<R, FacilitatorClientError>
    where
        R: serde::de::DeserializeOwned,
    {
        let req = self.client.get(url.clone());
        self.send(req, context).await
    }

    async fn send<R>(
        &self,
        mut req: reqwest::RequestBuilder,
        context: &'static str,
    ) -> Result<R, FacilitatorClientError>
    where
        R: serde::de::DeserializeOwned,
    {
        for (key, value) in &self.headers {
            req = req.header(key, value);
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req
            .send()
            .await
            .map_err(|e| FacilitatorClientError::Http { context, source: e })?;

        let result = if http_response.status() == StatusCode::OK {
            http_response
                .json::<R>()
                .await
                .map_err(|e| FacilitatorClientError::JsonDeserialization { context, source: e })
        } else {
            let status = http_response.status();
            let body = http_response
                .text()
                .await
                .map_err(|e| FacilitatorClientError::ResponseBodyRead { context, source: e })?;
            Err(FacilitatorClientError::HttpStatus {
                context,
                status,
                body,
            })
        };

        record_result_on_span(&result);

        result
    }
}

impl Facilitator for FacilitatorClient {
    type Error = FacilitatorClientError;

    #[cfg(feature = "telemetry")]
    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, Self::Error> {
        Self::verify(self, request)
            .instrument(tracing::info_span!(
                "x402.facilitator_client.verify",
                network = %request.payment_requirements().network,
                timeout = ?self.timeout
            ))
            .await
    }

    #[cfg(not(feature = "telemetry"))]
    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, Self::Error> {
        Self::verify(self, request).await
    }

    #[cfg(feature = "telemetry")]
    async fn settle(&self, request: &SettleRequest) -> Result<SettleResponse, Self::Error> {
        Self::settle(self, request)
            .instrument(tracing::info_span!(
                "x402.facilitator_client.settle",
                network = %request.inner().payment_requirements().network,
                timeout = ?self.timeout
            ))
            .await
    }

    #[cfg(not(feature = "telemetry"))]
    async fn settle(&self, request: &SettleRequest) -> Result<SettleResponse, Self::Error> {
        Self::settle(self, request).await
    }
}

impl TryFrom<&str> for FacilitatorClient {
    type Error = FacilitatorClientError;

    /// Parses a base URL, normalizing it to a single trailing slash.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut normalized = value.trim_end_matches('/').to_owned();
        normalized.push('/');
        let url = Url::parse(&normalized).map_err(|e| FacilitatorClientError::UrlParse {
            context: "Failed to parse base url",
            source: e,
        })?;
        Self::try_new(url)
    }
}

impl TryFrom<String> for FacilitatorClient {
    type Error = FacilitatorClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

/// Records the outcome of a request on the current span.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", tracing::field::display(err));
            tracing::event!(tracing::Level::ERROR, error = %err, "Request to facilitator failed");
        }
    }
}

#[cfg(not(feature = "telemetry"))]
const fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}
