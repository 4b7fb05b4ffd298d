//! HTTP seam used by the remote client.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

use crate::config::HttpConfig;

use super::RemoteError;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl HttpResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn is_unauthorized(&self) -> bool {
    self.status == 401
  }
}

/// Minimal GET/POST capability the remote client needs.
#[async_trait]
pub trait HttpTransport: Send + Sync {
  /// GET `uri`, sending `authorization` verbatim as the Authorization header.
  async fn get(&self, uri: &str, authorization: Option<&str>) -> Result<HttpResponse, RemoteError>;

  /// POST a form-encoded `body` to `uri`.
  async fn post(
    &self,
    uri: &str,
    body: String,
    authorization: &str,
  ) -> Result<HttpResponse, RemoteError>;
}

/// `HttpTransport` backed by a pooled reqwest client.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new(config: &HttpConfig) -> Result<Self, RemoteError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout))
      .danger_accept_invalid_certs(config.skip_tls_verify)
      .user_agent(concat!("cc-snapshot/", env!("CARGO_PKG_VERSION")))
      .build()?;

    Ok(Self { client })
  }

  async fn finish(request: reqwest::RequestBuilder) -> Result<HttpResponse, RemoteError> {
    let response = request.send().await?;
    let status = response.status().as_u16();
    let body = response.bytes().await?.to_vec();
    Ok(HttpResponse { status, body })
  }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
  async fn get(&self, uri: &str, authorization: Option<&str>) -> Result<HttpResponse, RemoteError> {
    let mut request = self.client.get(uri).header(ACCEPT, "application/json");
    if let Some(auth) = authorization {
      request = request.header(AUTHORIZATION, auth);
    }
    Self::finish(request).await
  }

  async fn post(
    &self,
    uri: &str,
    body: String,
    authorization: &str,
  ) -> Result<HttpResponse, RemoteError> {
    let request = self
      .client
      .post(uri)
      .header(ACCEPT, "application/json")
      .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
      .header(AUTHORIZATION, authorization)
      .body(body);
    Self::finish(request).await
  }
}
