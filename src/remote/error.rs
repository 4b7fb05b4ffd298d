use thiserror::Error;

/// Failures surfaced by the remote client.
#[derive(Error, Debug)]
pub enum RemoteError {
  #[error("{0}")]
  Transport(#[from] reqwest::Error),

  #[error("{0}")]
  Json(#[from] serde_json::Error),

  #[error("{0}")]
  Url(#[from] url::ParseError),

  #[error("Unexpected response code from get {uri} is {status}")]
  UnexpectedStatus { uri: String, status: u16 },

  #[error("Unexpected response code from login is {status}")]
  LoginFailed { status: u16 },

  #[error("Unable to fetch info from {uri} (status {status})")]
  InfoUnavailable { uri: String, status: u16 },

  #[error("Information retrieved from {uri} does not include {field}")]
  MissingEndpoint { uri: String, field: &'static str },
}
