use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable consulted when `uaa.password` is not in the file.
pub const PASSWORD_ENV: &str = "CC_SNAPSHOT_UAA_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Base URI of the Cloud Controller API (e.g. "https://api.example.com")
  pub cloud_controller_uri: String,
  /// Seconds between refreshes of each data set
  #[serde(default = "default_refresh_interval")]
  pub refresh_interval: u64,
  pub uaa: UaaConfig,
  #[serde(default)]
  pub http: HttpConfig,
  /// Tracing filter directive, overridden by RUST_LOG
  pub log_level: Option<String>,
  /// Write logs to this file instead of stderr
  pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UaaConfig {
  pub username: String,
  pub password: Option<String>,
  #[serde(default = "default_client_id")]
  pub client_id: String,
  #[serde(default)]
  pub client_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
  /// Per-request timeout in seconds
  #[serde(default = "default_timeout")]
  pub timeout: u64,
  #[serde(default)]
  pub skip_tls_verify: bool,
}

impl Default for HttpConfig {
  fn default() -> Self {
    Self {
      timeout: default_timeout(),
      skip_tls_verify: false,
    }
  }
}

fn default_refresh_interval() -> u64 {
  60
}

fn default_client_id() -> String {
  "cf".to_string()
}

fn default_timeout() -> u64 {
  30
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./cc-snapshot.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/cc-snapshot/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/cc-snapshot/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("cc-snapshot.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("cc-snapshot").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to load config file {}: {}", path.display(), e))
  }

  /// Parse and validate a YAML document.
  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config =
      serde_yaml::from_str(contents).map_err(|e| eyre!("Invalid configuration: {}", e))?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    Url::parse(&self.cloud_controller_uri).map_err(|e| {
      eyre!(
        "cloud_controller_uri '{}' is not a valid URL: {}",
        self.cloud_controller_uri,
        e
      )
    })?;

    if self.refresh_interval == 0 {
      return Err(eyre!("refresh_interval must be greater than zero"));
    }

    Ok(())
  }

  /// Cloud Controller base URI without a trailing slash.
  pub fn cc_base(&self) -> &str {
    self.cloud_controller_uri.trim_end_matches('/')
  }

  pub fn refresh_interval(&self) -> Duration {
    Duration::from_secs(self.refresh_interval)
  }

  /// Get the UAA password, from the config file or the environment.
  pub fn uaa_password(&self) -> Result<String> {
    if let Some(password) = &self.uaa.password {
      return Ok(password.clone());
    }

    std::env::var(PASSWORD_ENV).map_err(|_| {
      eyre!(
        "UAA password not found. Set uaa.password or the {} environment variable.",
        PASSWORD_ENV
      )
    })
  }
}
