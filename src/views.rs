//! Read accessors and derived views over the snapshot cache.
//!
//! Derived views are computed on every call from the cached collections and
//! are not cached themselves.

use color_eyre::{eyre::eyre, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::cache::{CacheResult, CacheStore, DataSetKey, Item, SlotStatus};

const STARTED: &str = "STARTED";

/// Space role joined from the deep user roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceRole {
  Auditor,
  Developer,
  Manager,
}

impl SpaceRole {
  /// Roster field listing the spaces a user holds this role in.
  pub fn roster_field(self) -> &'static str {
    match self {
      Self::Auditor => "audited_spaces",
      Self::Developer => "spaces",
      Self::Manager => "managed_spaces",
    }
  }
}

/// Consumer-facing view of the cache. Every accessor waits until the data
/// it needs has been fetched once.
#[derive(Clone)]
pub struct CacheView {
  store: Arc<CacheStore>,
}

impl CacheView {
  pub fn new(store: Arc<CacheStore>) -> Self {
    Self { store }
  }

  pub async fn applications(&self) -> Arc<CacheResult> {
    self.store.get(DataSetKey::Applications).await
  }

  pub async fn applications_count(&self) -> usize {
    self.applications().await.items.len()
  }

  pub async fn applications_running_instances(&self) -> u64 {
    let applications = self.applications().await;
    running_instances(&applications)
  }

  pub async fn applications_total_instances(&self) -> u64 {
    let applications = self.applications().await;
    total_instances(&applications)
  }

  pub async fn organizations(&self) -> Arc<CacheResult> {
    self.store.get(DataSetKey::Organizations).await
  }

  pub async fn organizations_count(&self) -> usize {
    self.organizations().await.items.len()
  }

  pub async fn spaces(&self) -> Arc<CacheResult> {
    self.store.get(DataSetKey::Spaces).await
  }

  pub async fn spaces_count(&self) -> usize {
    self.spaces().await.items.len()
  }

  pub async fn spaces_auditors(&self) -> CacheResult {
    self.space_roles(SpaceRole::Auditor).await
  }

  pub async fn spaces_developers(&self) -> CacheResult {
    self.space_roles(SpaceRole::Developer).await
  }

  pub async fn spaces_managers(&self) -> CacheResult {
    self.space_roles(SpaceRole::Manager).await
  }

  pub async fn space_roles(&self, role: SpaceRole) -> CacheResult {
    let roster = self.users_deep().await;
    role_memberships(&roster, role)
  }

  /// UAA user directory.
  pub async fn users(&self) -> Arc<CacheResult> {
    self.store.get(DataSetKey::UsersDirectory).await
  }

  pub async fn users_count(&self) -> usize {
    self.users().await.items.len()
  }

  pub async fn users_deep(&self) -> Arc<CacheResult> {
    self.store.get(DataSetKey::UsersDeep).await
  }

  /// Ask for `key` to be refetched now.
  pub fn refresh(&self, key: DataSetKey) {
    self.store.request_refresh(key);
  }

  pub async fn status(&self) -> Vec<SlotStatus> {
    self.store.status().await
  }
}

/// Instance count of one application; a missing or non-integer value counts
/// as zero and is logged.
fn instances(item: &Item) -> u64 {
  match item.get("instances").and_then(Value::as_u64) {
    Some(n) => n,
    None => {
      debug!(
        "Application {} has no usable instances field, counting 0",
        item.get("guid").and_then(serde_json::Value::as_str).unwrap_or("<unknown>")
      );
      0
    }
  }
}

/// Sum of `instances` over applications whose state is STARTED.
pub fn running_instances(applications: &CacheResult) -> u64 {
  applications
    .items
    .iter()
    .filter(|app| app.get("state").and_then(Value::as_str) == Some(STARTED))
    .map(instances)
    .sum()
}

/// Sum of `instances` over all applications.
pub fn total_instances(applications: &CacheResult) -> u64 {
  applications.items.iter().map(instances).sum()
}

/// Join the deep roster into `{user_guid, space_guid}` pairs for `role`,
/// in roster order.
pub fn role_memberships(roster: &CacheResult, role: SpaceRole) -> CacheResult {
  if !roster.connected {
    return CacheResult::disconnected();
  }

  match join_roles(&roster.items, role) {
    Ok(items) => CacheResult::from_network(items),
    Err(e) => {
      debug!("Error during {} join: {:?}", role.roster_field(), e);
      CacheResult::disconnected()
    }
  }
}

fn join_roles(users: &[Item], role: SpaceRole) -> Result<Vec<Item>> {
  let field = role.roster_field();
  let mut items = Vec::new();

  for user in users {
    let user_guid = guid(user).ok_or_else(|| eyre!("Roster user has no metadata.guid"))?;

    let spaces = user
      .get("entity")
      .and_then(|e| e.get(field))
      .and_then(Value::as_array)
      .ok_or_else(|| eyre!("Roster user {} has no entity.{}", user_guid, field))?;

    for space in spaces {
      let space_guid = space
        .as_object()
        .and_then(guid)
        .ok_or_else(|| eyre!("Space in {} of user {} has no guid", field, user_guid))?;

      let mut item = Map::new();
      item.insert("user_guid".into(), Value::from(user_guid));
      item.insert("space_guid".into(), Value::from(space_guid));
      items.push(item);
    }
  }

  Ok(items)
}

fn guid(record: &Item) -> Option<&str> {
  record.get("metadata")?.get("guid")?.as_str()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn result(items: Value) -> CacheResult {
    let items = items
      .as_array()
      .unwrap()
      .iter()
      .map(|v| v.as_object().unwrap().clone())
      .collect();
    CacheResult::from_network(items)
  }

  fn roster() -> CacheResult {
    result(json!([
      {
        "metadata": {"guid": "u2"},
        "entity": {
          "audited_spaces": [{"metadata": {"guid": "s9"}}],
          "spaces": [{"metadata": {"guid": "s3"}}, {"metadata": {"guid": "s1"}}],
          "managed_spaces": []
        }
      },
      {
        "metadata": {"guid": "u1"},
        "entity": {
          "audited_spaces": [],
          "spaces": [{"metadata": {"guid": "s2"}}],
          "managed_spaces": [{"metadata": {"guid": "s2"}}]
        }
      }
    ]))
  }

  fn pairs(result: &CacheResult) -> Vec<(String, String)> {
    result
      .items
      .iter()
      .map(|i| {
        (
          i["user_guid"].as_str().unwrap().to_string(),
          i["space_guid"].as_str().unwrap().to_string(),
        )
      })
      .collect()
  }

  #[test]
  fn test_instance_sums() {
    let apps = result(json!([
      {"state": "STARTED", "instances": 3},
      {"state": "STOPPED", "instances": 2}
    ]));

    assert_eq!(running_instances(&apps), 3);
    assert_eq!(total_instances(&apps), 5);
  }

  #[test]
  fn test_missing_instances_count_as_zero() {
    let apps = result(json!([
      {"guid": "a", "state": "STARTED"},
      {"guid": "b", "state": "STARTED", "instances": "two"},
      {"guid": "c", "state": "STARTED", "instances": 2}
    ]));

    assert_eq!(running_instances(&apps), 2);
    assert_eq!(total_instances(&apps), 2);
  }

  #[test]
  fn test_developers_follow_roster_order() {
    let developers = role_memberships(&roster(), SpaceRole::Developer);

    assert!(developers.connected);
    assert_eq!(
      pairs(&developers),
      vec![
        ("u2".to_string(), "s3".to_string()),
        ("u2".to_string(), "s1".to_string()),
        ("u1".to_string(), "s2".to_string()),
      ]
    );
  }

  #[test]
  fn test_auditors_and_managers() {
    let auditors = role_memberships(&roster(), SpaceRole::Auditor);
    let managers = role_memberships(&roster(), SpaceRole::Manager);

    assert_eq!(pairs(&auditors), vec![("u2".to_string(), "s9".to_string())]);
    assert_eq!(pairs(&managers), vec![("u1".to_string(), "s2".to_string())]);
  }

  #[test]
  fn test_disconnected_roster_skips_join() {
    let roles = role_memberships(&CacheResult::disconnected(), SpaceRole::Manager);
    assert_eq!(roles, CacheResult::disconnected());
  }

  #[test]
  fn test_malformed_roster_is_disconnected() {
    let broken = result(json!([{"metadata": {"guid": "u1"}, "entity": {}}]));
    let roles = role_memberships(&broken, SpaceRole::Auditor);
    assert_eq!(roles, CacheResult::disconnected());
  }

  #[tokio::test]
  async fn test_view_reads_store() {
    let store = Arc::new(CacheStore::new());
    let view = CacheView::new(store.clone());

    store
      .publish(
        DataSetKey::Applications,
        result(json!([
          {"state": "STARTED", "instances": 1},
          {"state": "STARTED", "instances": 4},
          {"state": "STOPPED", "instances": 2}
        ])),
      )
      .await;
    store.publish(DataSetKey::UsersDeep, roster()).await;

    assert_eq!(view.applications_count().await, 3);
    assert_eq!(view.applications_running_instances().await, 5);
    assert_eq!(view.applications_total_instances().await, 7);
    assert_eq!(view.spaces_developers().await.items.len(), 3);
  }
}
