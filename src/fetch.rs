//! Per-data-set fetchers that reshape raw API records into cache items.

use async_trait::async_trait;
use color_eyre::{
  eyre::{eyre, WrapErr},
  Result,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::cache::{CacheResult, DataSetKey, Fetcher, Item};
use crate::remote::api_types::ApiUaaUser;
use crate::remote::RemoteClient;

const APPS_PATH: &str = "v2/apps";
const ORGANIZATIONS_PATH: &str = "v2/organizations";
const SPACES_PATH: &str = "v2/spaces";
const USERS_DEEP_PATH: &str = "v2/users?inline-relations-depth=1";
const UAA_USERS_PATH: &str = "Users";

/// Fetches every data set through a shared [`RemoteClient`].
pub struct RemoteFetcher {
  client: Arc<RemoteClient>,
}

impl RemoteFetcher {
  pub fn new(client: Arc<RemoteClient>) -> Self {
    Self { client }
  }

  async fn discover(&self, key: DataSetKey) -> Result<Vec<Item>> {
    match key {
      DataSetKey::Applications => self.discover_cc(APPS_PATH).await,
      DataSetKey::Organizations => self.discover_cc(ORGANIZATIONS_PATH).await,
      DataSetKey::Spaces => self.discover_cc(SPACES_PATH).await,
      DataSetKey::UsersDeep => {
        let records = self.client.get_cc(USERS_DEEP_PATH).await?;
        records.into_iter().map(into_object).collect()
      }
      DataSetKey::UsersDirectory => {
        let records = self.client.get_uaa(UAA_USERS_PATH).await?;
        records.into_iter().map(flatten_uaa_user).collect()
      }
    }
  }

  async fn discover_cc(&self, path: &str) -> Result<Vec<Item>> {
    let records = self
      .client
      .get_cc(path)
      .await
      .wrap_err_with(|| format!("Failed to list {}", path))?;
    records.into_iter().map(merge_entity_metadata).collect()
  }
}

#[async_trait]
impl Fetcher for RemoteFetcher {
  async fn fetch(&self, key: DataSetKey) -> CacheResult {
    match self.discover(key).await {
      Ok(items) => CacheResult::from_network(items),
      Err(e) => {
        debug!("Error during {} discovery: {}", key, e);
        debug!("{:?}", e);
        CacheResult::disconnected()
      }
    }
  }
}

fn into_object(record: Value) -> Result<Item> {
  match record {
    Value::Object(map) => Ok(map),
    other => Err(eyre!("Expected a JSON object, got {}", other)),
  }
}

/// Flatten a CC record: `entity` fields, then `metadata` fields on top.
pub fn merge_entity_metadata(record: Value) -> Result<Item> {
  let mut record = into_object(record)?;

  let mut item = match record.remove("entity") {
    Some(Value::Object(entity)) => entity,
    _ => return Err(eyre!("Record has no entity object")),
  };

  match record.remove("metadata") {
    Some(Value::Object(metadata)) => item.extend(metadata),
    _ => return Err(eyre!("Record has no metadata object")),
  }

  Ok(item)
}

/// Flatten a UAA user into a flat attribute set.
///
/// Optional attributes are omitted, never null, when the source lacks them.
pub fn flatten_uaa_user(record: Value) -> Result<Item> {
  let user: ApiUaaUser =
    serde_json::from_value(record).wrap_err("Failed to parse UAA user record")?;

  let mut authorities: Vec<String> = user.groups.into_iter().map(|g| g.display).collect();
  authorities.sort();

  let mut item = Map::new();
  item.insert("active".into(), user.active);
  item.insert("authorities".into(), Value::from(authorities.join(", ")));
  item.insert("created".into(), user.meta.created);
  item.insert("id".into(), Value::from(user.id));
  item.insert("last_modified".into(), user.meta.last_modified);
  item.insert("version".into(), user.meta.version);

  if let Some(email) = user.emails.and_then(|e| e.into_iter().next()) {
    item.insert("email".into(), Value::from(email.value));
  }

  let name = user.name.unwrap_or_default();
  if let Some(family_name) = name.family_name {
    item.insert("familyname".into(), Value::from(family_name));
  }
  if let Some(given_name) = name.given_name {
    item.insert("givenname".into(), Value::from(given_name));
  }
  if let Some(user_name) = user.user_name {
    item.insert("username".into(), Value::from(user_name));
  }

  Ok(item)
}
