//! Serde-deserializable types matching Cloud Controller and UAA responses.
//!
//! List records stay as raw JSON objects; the fetchers decide how to
//! reshape them per data set.

use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Discovery and login
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiInfo {
  pub authorization_endpoint: Option<String>,
  pub token_endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTokenResponse {
  pub token_type: String,
  pub access_token: String,
}

// ============================================================================
// Paginated lists
// ============================================================================

/// Cloud Controller page: follow `next_url` until it is null or empty.
#[derive(Debug, Deserialize)]
pub struct ApiCcPage {
  pub resources: Vec<Value>,
  pub next_url: Option<String>,
}

/// UAA SCIM page: offset pagination driven by `totalResults`.
#[derive(Debug, Deserialize)]
pub struct ApiUaaPage {
  pub resources: Vec<Value>,
  #[serde(rename = "totalResults")]
  pub total_results: u64,
}

// ============================================================================
// UAA user record
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiUaaEmail {
  pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiUaaGroup {
  pub display: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiUaaMeta {
  pub created: Value,
  #[serde(rename = "lastModified")]
  pub last_modified: Value,
  pub version: Value,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiUaaName {
  #[serde(rename = "familyName")]
  pub family_name: Option<String>,
  #[serde(rename = "givenName")]
  pub given_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiUaaUser {
  pub id: String,
  #[serde(rename = "userName")]
  pub user_name: Option<String>,
  pub active: Value,
  pub emails: Option<Vec<ApiUaaEmail>>,
  pub groups: Vec<ApiUaaGroup>,
  pub meta: ApiUaaMeta,
  #[serde(default)]
  pub name: Option<ApiUaaName>,
}
