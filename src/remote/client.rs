use base64::{engine::general_purpose::STANDARD, Engine as _};
use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;

use super::api_types::{ApiCcPage, ApiInfo, ApiTokenResponse, ApiUaaPage};
use super::transport::{HttpTransport, ReqwestTransport};
use super::RemoteError;

/// Operator credentials exchanged for a token with the password grant.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub username: String,
  pub password: String,
  pub client_id: String,
  pub client_secret: String,
}

/// Endpoints advertised by the Cloud Controller info document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
  pub authorization_endpoint: String,
  pub token_endpoint: String,
}

/// Process-wide authentication state, shared by every fetch.
///
/// Concurrent callers that both observe a 401 will both log in; the later
/// token simply replaces the earlier one.
#[derive(Default)]
struct Session {
  endpoints: OnceCell<Endpoints>,
  token: RwLock<Option<String>>,
}

/// Authenticated client for the Cloud Controller and UAA APIs.
pub struct RemoteClient {
  transport: Arc<dyn HttpTransport>,
  cc_base: String,
  credentials: Credentials,
  session: Session,
}

impl RemoteClient {
  pub fn new(config: &Config) -> Result<Self> {
    let transport = ReqwestTransport::new(&config.http)
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    let credentials = Credentials {
      username: config.uaa.username.clone(),
      password: config.uaa_password()?,
      client_id: config.uaa.client_id.clone(),
      client_secret: config.uaa.client_secret.clone(),
    };

    Ok(Self::with_transport(
      Arc::new(transport),
      config.cc_base(),
      credentials,
    ))
  }

  pub fn with_transport(
    transport: Arc<dyn HttpTransport>,
    cc_base: &str,
    credentials: Credentials,
  ) -> Self {
    Self {
      transport,
      cc_base: cc_base.trim_end_matches('/').to_string(),
      credentials,
      session: Session::default(),
    }
  }

  /// Resolve the login endpoints once per process.
  ///
  /// Failures are not memoized, so the next call retries the lookup.
  pub async fn endpoints(&self) -> Result<&Endpoints, RemoteError> {
    self
      .session
      .endpoints
      .get_or_try_init(|| self.fetch_info())
      .await
  }

  async fn fetch_info(&self) -> Result<Endpoints, RemoteError> {
    let uri = format!("{}/info", self.cc_base);
    let response = self.transport.get(&uri, None).await?;

    if !response.is_success() {
      return Err(RemoteError::InfoUnavailable {
        uri,
        status: response.status,
      });
    }

    let info: ApiInfo = serde_json::from_slice(&response.body)?;

    let authorization_endpoint =
      info
        .authorization_endpoint
        .ok_or_else(|| RemoteError::MissingEndpoint {
          uri: uri.clone(),
          field: "authorization_endpoint",
        })?;

    let token_endpoint = info
      .token_endpoint
      .ok_or_else(|| RemoteError::MissingEndpoint {
        uri: uri.clone(),
        field: "token_endpoint",
      })?;

    Ok(Endpoints {
      authorization_endpoint,
      token_endpoint: token_endpoint.trim_end_matches('/').to_string(),
    })
  }

  /// Exchange the operator credentials for a fresh token and store it.
  pub async fn login(&self) -> Result<String, RemoteError> {
    let endpoints = self.endpoints().await?;
    let uri = format!("{}/oauth/token", endpoints.token_endpoint);

    let body = url::form_urlencoded::Serializer::new(String::new())
      .append_pair("grant_type", "password")
      .append_pair("username", &self.credentials.username)
      .append_pair("password", &self.credentials.password)
      .finish();

    let basic = STANDARD.encode(format!(
      "{}:{}",
      self.credentials.client_id, self.credentials.client_secret
    ));

    debug!("Logging in to {} as {}", uri, self.credentials.username);
    let response = self
      .transport
      .post(&uri, body, &format!("Basic {}", basic))
      .await;

    let response = match response {
      Ok(r) if r.is_success() => r,
      Ok(r) => {
        *self.session.token.write().await = None;
        return Err(RemoteError::LoginFailed { status: r.status });
      }
      Err(e) => {
        *self.session.token.write().await = None;
        return Err(e);
      }
    };

    let grant: ApiTokenResponse = match serde_json::from_slice(&response.body) {
      Ok(grant) => grant,
      Err(e) => {
        *self.session.token.write().await = None;
        return Err(e.into());
      }
    };
    let token = format!("{} {}", grant.token_type, grant.access_token);
    *self.session.token.write().await = Some(token.clone());

    Ok(token)
  }

  /// GET a JSON document, logging in first if needed and re-logging in
  /// exactly once if the token is rejected.
  pub async fn get_json<T: DeserializeOwned>(&self, uri: &str) -> Result<T, RemoteError> {
    self.endpoints().await?;

    let current = self.session.token.read().await.clone();
    let (mut token, mut recent_login) = match current {
      Some(token) => (token, false),
      None => (self.login().await?, true),
    };

    loop {
      let response = self.transport.get(uri, Some(&token)).await?;

      if response.is_success() {
        return Ok(serde_json::from_slice(&response.body)?);
      }

      if response.is_unauthorized() && !recent_login {
        warn!("Token rejected by {}, logging in again", uri);
        token = self.login().await?;
        recent_login = true;
        continue;
      }

      return Err(RemoteError::UnexpectedStatus {
        uri: uri.to_string(),
        status: response.status,
      });
    }
  }

  /// Fetch every page of a Cloud Controller list, following `next_url`.
  pub async fn get_cc(&self, path: &str) -> Result<Vec<Value>, RemoteError> {
    let mut uri = format!("{}/{}", self.cc_base, path.trim_start_matches('/'));
    let mut resources = Vec::new();

    loop {
      let page: ApiCcPage = self.get_json(&uri).await?;
      resources.extend(page.resources);

      match page.next_url.as_deref() {
        None | Some("") => return Ok(resources),
        Some(next) => uri = self.continuation(next)?,
      }
    }
  }

  /// Fetch every page of a UAA SCIM list using `startIndex` offsets.
  pub async fn get_uaa(&self, path: &str) -> Result<Vec<Value>, RemoteError> {
    let endpoints = self.endpoints().await?;
    let base = format!(
      "{}/{}",
      endpoints.token_endpoint,
      path.trim_start_matches('/')
    );
    let separator = if base.contains('?') { '&' } else { '?' };

    let mut resources: Vec<Value> = Vec::new();

    loop {
      let start_index = resources.len() + 1;
      let uri = format!("{}{}startIndex={}", base, separator, start_index);

      let page: ApiUaaPage = self.get_json(&uri).await?;
      if page.resources.is_empty() {
        return Ok(resources);
      }
      resources.extend(page.resources);

      if resources.len() as u64 >= page.total_results {
        return Ok(resources);
      }
    }
  }

  fn continuation(&self, next_url: &str) -> Result<String, RemoteError> {
    match Url::parse(next_url) {
      Ok(absolute) => Ok(absolute.into()),
      Err(url::ParseError::RelativeUrlWithoutBase) => {
        if next_url.starts_with('/') {
          Ok(format!("{}{}", self.cc_base, next_url))
        } else {
          Ok(format!("{}/{}", self.cc_base, next_url))
        }
      }
      Err(e) => Err(e.into()),
    }
  }
}
