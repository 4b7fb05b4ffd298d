//! Core types for the snapshot cache.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// One cached record; its shape depends on the data set.
pub type Item = Map<String, Value>;

/// Identifies one cached collection and the fetcher that fills it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataSetKey {
  Applications,
  Organizations,
  Spaces,
  /// CC users with space roles inlined
  UsersDeep,
  /// UAA user directory
  UsersDirectory,
}

impl DataSetKey {
  pub const ALL: [DataSetKey; 5] = [
    DataSetKey::Applications,
    DataSetKey::Organizations,
    DataSetKey::Spaces,
    DataSetKey::UsersDeep,
    DataSetKey::UsersDirectory,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Self::Applications => "applications",
      Self::Organizations => "organizations",
      Self::Spaces => "spaces",
      Self::UsersDeep => "users_cc_deep",
      Self::UsersDirectory => "users_uaa",
    }
  }
}

impl fmt::Display for DataSetKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Outcome of the latest fetch for a data set.
///
/// `connected == false` means the fetch failed and `items` is empty; a
/// failure never carries a partial list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheResult {
  pub connected: bool,
  pub items: Vec<Item>,
}

impl CacheResult {
  /// Create a result from freshly fetched items.
  pub fn from_network(items: Vec<Item>) -> Self {
    Self {
      connected: true,
      items,
    }
  }

  /// The result published when a fetch fails.
  pub fn disconnected() -> Self {
    Self {
      connected: false,
      items: Vec::new(),
    }
  }
}

/// Point-in-time description of one slot, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SlotStatus {
  pub key: &'static str,
  pub populated: bool,
  pub connected: bool,
  pub item_count: usize,
  pub refreshed_at: Option<DateTime<Utc>>,
}
