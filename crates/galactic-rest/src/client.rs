//! JSON REST client

use crate::error::{RestError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Longest `Retry-After` wait honoured before a retry
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Source of bearer tokens that may expire
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String>;

    /// Drop any cached token so the next call fetches a new one
    async fn invalidate(&self) {}
}

#[derive(Clone, Default)]
pub enum Credentials {
    #[default]
    None,
    Bearer(String),
    Basic {
        username: String,
        password: Option<String>,
    },
    Provider(Arc<dyn TokenProvider>),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::None => f.write_str("None"),
            Credentials::Bearer(_) => f.write_str("Bearer(***)"),
            Credentials::Basic { username, .. } => {
                f.debug_struct("Basic").field("username", username).finish()
            }
            Credentials::Provider(_) => f.write_str("Provider"),
        }
    }
}

pub struct RestClientBuilder {
    base_url: String,
    credentials: Credentials,
    headers: Vec<(String, String)>,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl RestClientBuilder {
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.credentials = Credentials::Bearer(token.into());
        self
    }

    pub fn basic(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.credentials = Credentials::Basic {
            username: username.into(),
            password,
        };
        self
    }

    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.credentials = Credentials::Provider(provider);
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Header sent with every request
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Opt in to retrying 429 and 502-504 responses of idempotent methods
    /// (GET, HEAD, PUT, DELETE) with doubling delay. Off by default.
    pub fn retries(mut self, max_retries: u32, initial_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = initial_delay;
        self
    }

    pub fn build(self) -> Result<RestClient> {
        let mut base_url = Url::parse(&self.base_url)?;
        // Url::join drops the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| RestError::InvalidHeader(format!("{}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| RestError::InvalidHeader(format!("{}: {}", name, e)))?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()?;

        Ok(RestClient {
            http,
            base_url,
            credentials: self.credentials,
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
        })
    }
}

/// HTTP client for JSON APIs rooted at a base URL
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    max_retries: u32,
    retry_delay: Duration,
}

impl RestClient {
    pub fn builder(base_url: impl Into<String>) -> RestClientBuilder {
        RestClientBuilder {
            base_url: base_url.into(),
            credentials: Credentials::None,
            headers: Vec::new(),
            timeout: Duration::from_secs(30),
            max_retries: 0,
            retry_delay: Duration::from_millis(500),
        }
    }

    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder(base_url).build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path against the base URL; absolute URLs pass through
    pub fn url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, None::<&()>).await?;
        Self::decode(response).await
    }

    /// GET a non-JSON body as text
    pub async fn get_text(&self, path: &str) -> Result<String> {
        let response = self.send(Method::GET, path, None::<&()>).await?;
        Ok(response.text().await?)
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(Method::POST, path, Some(body)).await?;
        Self::decode(response).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(Method::PUT, path, Some(body)).await?;
        Self::decode(response).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(Method::PATCH, path, Some(body)).await?;
        Self::decode(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(Method::DELETE, path, None::<&()>).await?;
        Ok(())
    }

    /// Empty bodies decode as JSON `null`, so `()` and `Option<T>` accept 204 responses
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let text = response.text().await?;
        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        Ok(serde_json::from_str(body)?)
    }

    async fn authorize(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        Ok(match &self.credentials {
            Credentials::None => request,
            Credentials::Bearer(token) => request.bearer_auth(token),
            Credentials::Basic { username, password } => request.basic_auth(username, password.as_ref()),
            Credentials::Provider(provider) => request.bearer_auth(provider.token().await?),
        })
    }

    /// Send a request. Non-success statuses become [`RestError::Status`].
    ///
    /// Throttled and transient failures of idempotent methods are retried only
    /// when the client was built with [`RestClientBuilder::retries`].
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        self.send_with(method, path, |request| match body {
            Some(body) => request.json(body),
            None => request,
        })
        .await
    }

    /// POST a non-JSON body and return the response body as text
    pub async fn post_text(&self, path: &str, content_type: &str, body: &str) -> Result<String> {
        let response = self
            .send_with(Method::POST, path, |request| {
                request
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .body(body.to_string())
            })
            .await?;
        Ok(response.text().await?)
    }

    async fn send_with<F>(&self, method: Method, path: &str, attach_body: F) -> Result<reqwest::Response>
    where
        F: Fn(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    {
        let url = self.url(path)?;
        let mut retries = 0;
        let mut delay = self.retry_delay;
        let mut refreshed_token = false;
        let max_retries = if is_idempotent(&method) {
            self.max_retries
        } else {
            0
        };

        loop {
            let request = attach_body(self.http.request(method.clone(), url.clone()));
            let request = self.authorize(request).await?;

            debug!(method = %method, url = %url, "Sending request");
            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::UNAUTHORIZED && !refreshed_token {
                if let Credentials::Provider(provider) = &self.credentials {
                    debug!("Token rejected, refreshing");
                    provider.invalidate().await;
                    refreshed_token = true;
                    continue;
                }
            }

            let transient = matches!(
                status,
                StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            );
            if transient && retries < max_retries {
                retries += 1;
                let wait = retry_after(response.headers()).unwrap_or(delay);
                warn!(
                    status = %status,
                    retry = retries,
                    max_retries,
                    "Transient error, retrying after {:?}",
                    wait
                );
                tokio::time::sleep(wait).await;
                delay *= 2;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(RestError::Status {
                status: status.as_u16(),
                body,
            });
        }
    }
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

/// `Retry-After` in seconds, capped at [`MAX_RETRY_AFTER`]
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}
