//! Scripted in-memory transport for tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::client::{Credentials, RemoteClient};
use super::transport::{HttpResponse, HttpTransport};
use super::RemoteError;

pub const CC: &str = "https://api.test";
pub const UAA: &str = "https://uaa.test";
pub const TOKEN_URI: &str = "https://uaa.test/oauth/token";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
  pub method: &'static str,
  pub uri: String,
  pub authorization: Option<String>,
  pub body: Option<String>,
}

/// Replays queued responses per (method, uri). The last queued response for
/// a route repeats forever; unknown routes answer 404.
#[derive(Default)]
pub struct FakeTransport {
  routes: Mutex<HashMap<(&'static str, String), VecDeque<HttpResponse>>>,
  requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTransport {
  /// A transport with the info document and two successive login tokens.
  pub fn cloud() -> Arc<Self> {
    let transport = Arc::new(Self::default());
    transport.respond(
      &format!("{}/info", CC),
      200,
      json!({"authorization_endpoint": "https://login.test", "token_endpoint": UAA}),
    );
    transport.respond_post(
      TOKEN_URI,
      200,
      json!({"token_type": "bearer", "access_token": "token-1"}),
    );
    transport.respond_post(
      TOKEN_URI,
      200,
      json!({"token_type": "bearer", "access_token": "token-2"}),
    );
    transport
  }

  pub fn respond(&self, uri: &str, status: u16, body: Value) {
    self.push("GET", uri, status, body);
  }

  pub fn respond_post(&self, uri: &str, status: u16, body: Value) {
    self.push("POST", uri, status, body);
  }

  fn push(&self, method: &'static str, uri: &str, status: u16, body: Value) {
    let response = HttpResponse {
      status,
      body: serde_json::to_vec(&body).unwrap(),
    };
    self
      .routes
      .lock()
      .unwrap()
      .entry((method, uri.to_string()))
      .or_default()
      .push_back(response);
  }

  pub fn requests(&self) -> Vec<RecordedRequest> {
    self.requests.lock().unwrap().clone()
  }

  pub fn count(&self, method: &str, uri: &str) -> usize {
    self
      .requests
      .lock()
      .unwrap()
      .iter()
      .filter(|r| r.method == method && r.uri == uri)
      .count()
  }

  fn answer(&self, request: RecordedRequest) -> HttpResponse {
    let key = (request.method, request.uri.clone());
    self.requests.lock().unwrap().push(request);

    let mut routes = self.routes.lock().unwrap();
    match routes.get_mut(&key) {
      Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
      Some(queue) if !queue.is_empty() => queue[0].clone(),
      _ => HttpResponse {
        status: 404,
        body: b"{}".to_vec(),
      },
    }
  }
}

#[async_trait]
impl HttpTransport for FakeTransport {
  async fn get(&self, uri: &str, authorization: Option<&str>) -> Result<HttpResponse, RemoteError> {
    Ok(self.answer(RecordedRequest {
      method: "GET",
      uri: uri.to_string(),
      authorization: authorization.map(String::from),
      body: None,
    }))
  }

  async fn post(
    &self,
    uri: &str,
    body: String,
    authorization: &str,
  ) -> Result<HttpResponse, RemoteError> {
    Ok(self.answer(RecordedRequest {
      method: "POST",
      uri: uri.to_string(),
      authorization: Some(authorization.to_string()),
      body: Some(body),
    }))
  }
}

pub fn test_client(transport: Arc<FakeTransport>) -> RemoteClient {
  RemoteClient::with_transport(
    transport,
    CC,
    Credentials {
      username: "admin".to_string(),
      password: "s3cret".to_string(),
      client_id: "cf".to_string(),
      client_secret: String::new(),
    },
  )
}
