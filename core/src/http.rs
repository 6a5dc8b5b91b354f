// storefront/src/http.rs

//! Thin wrapper over `reqwest` that every backend call goes through.
//!
//! The session cookie rides along on every request through the client's cookie
//! store; a bearer token is attached as well once a login response supplies one.

use crate::error::{ApiError, Result, StorefrontError};
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone)]
pub struct ApiClient {
  client: reqwest::Client,
  base_url: Url,
  bearer: Arc<RwLock<Option<String>>>,
  default_timeout: Duration,
}

impl ApiClient {
  pub fn new(base_url: &str, default_timeout: Duration) -> Result<Self> {
    let mut base_url =
      Url::parse(base_url).map_err(|e| StorefrontError::Config(format!("Invalid API base URL '{base_url}': {e}")))?;
    // Url::join drops the last segment unless the base ends with '/'.
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let client = reqwest::Client::builder()
      .default_headers(headers)
      .cookie_store(true)
      .build()
      .map_err(|e| StorefrontError::Config(format!("failed to build HTTP client: {e}")))?;

    Ok(Self {
      client,
      base_url,
      bearer: Arc::new(RwLock::new(None)),
      default_timeout,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  pub fn set_bearer_token(&self, token: Option<String>) {
    *self.bearer.write() = token;
  }

  pub fn has_bearer_token(&self) -> bool {
    self.bearer.read().is_some()
  }

  fn url(&self, path: &str) -> std::result::Result<Url, ApiError> {
    self
      .base_url
      .join(path.trim_start_matches('/'))
      .map_err(|_| ApiError::Url(path.to_string()))
  }

  fn request(&self, method: Method, path: &str) -> std::result::Result<RequestBuilder, ApiError> {
    let mut builder = self.client.request(method, self.url(path)?);
    if let Some(token) = self.bearer.read().as_deref() {
      builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    Ok(builder)
  }

  pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> std::result::Result<T, ApiError> {
    let builder = self.request(Method::GET, path)?;
    self.send(path, builder, self.default_timeout).await
  }

  pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
    &self,
    path: &str,
    body: &B,
  ) -> std::result::Result<T, ApiError> {
    self.post_json_with(path, body, self.default_timeout, None).await
  }

  /// POST with an explicit timeout and an optional idempotency key.
  pub async fn post_json_with<B: Serialize + ?Sized, T: DeserializeOwned>(
    &self,
    path: &str,
    body: &B,
    timeout: Duration,
    idempotency_key: Option<&str>,
  ) -> std::result::Result<T, ApiError> {
    let mut builder = self.request(Method::POST, path)?.json(body);
    if let Some(key) = idempotency_key {
      builder = builder.header(IDEMPOTENCY_KEY_HEADER, key);
    }
    self.send(path, builder, timeout).await
  }

  /// POST that only requires a 2xx. The body comes back as text, whatever it
  /// holds, so callers can read it leniently.
  pub async fn post_text_with<B: Serialize + ?Sized>(
    &self,
    path: &str,
    body: &B,
    timeout: Duration,
    idempotency_key: Option<&str>,
  ) -> std::result::Result<String, ApiError> {
    let mut builder = self.request(Method::POST, path)?.json(body);
    if let Some(key) = idempotency_key {
      builder = builder.header(IDEMPOTENCY_KEY_HEADER, key);
    }
    self.send_raw(path, builder, timeout).await
  }

  pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
    &self,
    path: &str,
    body: &B,
  ) -> std::result::Result<T, ApiError> {
    let builder = self.request(Method::PUT, path)?.json(body);
    self.send(path, builder, self.default_timeout).await
  }

  async fn send<T: DeserializeOwned>(
    &self,
    path: &str,
    builder: RequestBuilder,
    timeout: Duration,
  ) -> std::result::Result<T, ApiError> {
    let body = self.send_raw(path, builder, timeout).await?;
    // Some endpoints answer 2xx with an empty body; let `()`/`Value` callers accept that.
    let body = if body.trim().is_empty() { "null" } else { body.as_str() };
    serde_json::from_str(body).map_err(|e| ApiError::Decode {
      path: path.to_string(),
      message: e.to_string(),
    })
  }

  /// Sends the request and returns the raw body of a 2xx response.
  #[instrument(name = "ApiClient::send", skip_all, fields(path = %path))]
  async fn send_raw(
    &self,
    path: &str,
    builder: RequestBuilder,
    timeout: Duration,
  ) -> std::result::Result<String, ApiError> {
    let response = tokio::time::timeout(timeout, builder.send())
      .await
      .map_err(|_| ApiError::Timeout {
        path: path.to_string(),
        seconds: timeout.as_secs(),
      })?
      .map_err(|source| ApiError::Transport {
        path: path.to_string(),
        source,
      })?;

    let status = response.status();
    debug!(status = %status, "response received");

    let body = response.text().await.map_err(|source| ApiError::Transport {
      path: path.to_string(),
      source,
    })?;

    if !status.is_success() {
      return Err(ApiError::Status {
        path: path.to_string(),
        status,
        body,
      });
    }
    Ok(body)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn joins_paths_under_a_base_with_a_prefix() {
    let api = ApiClient::new("http://api.test/v1", Duration::from_secs(1)).unwrap();
    assert_eq!(api.url("/payment/verify").unwrap().as_str(), "http://api.test/v1/payment/verify");
    assert_eq!(api.url("me").unwrap().as_str(), "http://api.test/v1/me");
  }

  #[test]
  fn rejects_an_unparseable_base_url() {
    assert!(matches!(
      ApiClient::new("not a url", Duration::from_secs(1)),
      Err(StorefrontError::Config(_))
    ));
  }
}
