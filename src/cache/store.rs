//! Per-key result slots with publish/await semantics.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};

use super::types::{CacheResult, DataSetKey, SlotStatus};

#[derive(Debug, Clone)]
struct Published {
  result: Arc<CacheResult>,
  refreshed_at: DateTime<Utc>,
}

#[derive(Default)]
struct Slot {
  value: RwLock<Option<Published>>,
  /// Signalled on every publish
  published: Notify,
  /// Ends the scheduler's wait early
  wake: Notify,
}

/// Holds the latest result for every data set.
///
/// Each slot has exactly one writer (its scheduler task). Readers wait until
/// the slot has been published once and never wait again afterwards.
pub struct CacheStore {
  slots: HashMap<DataSetKey, Slot>,
}

impl Default for CacheStore {
  fn default() -> Self {
    Self::new()
  }
}

impl CacheStore {
  pub fn new() -> Self {
    let slots = DataSetKey::ALL
      .iter()
      .map(|&key| (key, Slot::default()))
      .collect();
    Self { slots }
  }

  fn slot(&self, key: DataSetKey) -> &Slot {
    // Every key is inserted in new()
    &self.slots[&key]
  }

  /// Wait until `key` has been published at least once, then return the
  /// current result.
  pub async fn get(&self, key: DataSetKey) -> Arc<CacheResult> {
    let slot = self.slot(key);

    loop {
      let notified = slot.published.notified();
      tokio::pin!(notified);
      // Register before checking so a publish in between is not missed
      notified.as_mut().enable();

      if let Some(published) = slot.value.read().await.as_ref() {
        return published.result.clone();
      }

      notified.await;
    }
  }

  /// Blocking variant of [`get`](Self::get) for threads outside the runtime.
  pub fn get_blocking(&self, key: DataSetKey) -> Arc<CacheResult> {
    futures::executor::block_on(self.get(key))
  }

  /// Return the current result without waiting, if any.
  pub async fn peek(&self, key: DataSetKey) -> Option<Arc<CacheResult>> {
    self
      .slot(key)
      .value
      .read()
      .await
      .as_ref()
      .map(|p| p.result.clone())
  }

  /// Replace the result for `key` and wake every waiting reader.
  pub async fn publish(&self, key: DataSetKey, result: CacheResult) {
    let slot = self.slot(key);
    {
      let mut value = slot.value.write().await;
      *value = Some(Published {
        result: Arc::new(result),
        refreshed_at: Utc::now(),
      });
    }
    slot.published.notify_waiters();
  }

  /// Wait for the refresh interval to elapse or for a wake request.
  pub async fn wait_for_refresh(&self, key: DataSetKey, interval: Duration) {
    let slot = self.slot(key);
    tokio::select! {
      _ = tokio::time::sleep(interval) => {}
      _ = slot.wake.notified() => {}
    }
  }

  /// Ask the scheduler for `key` to refresh now instead of at the end of
  /// its interval. A request made while a fetch is running applies to the
  /// next wait.
  pub fn request_refresh(&self, key: DataSetKey) {
    self.slot(key).wake.notify_one();
  }

  /// Describe every slot, in key order.
  pub async fn status(&self) -> Vec<SlotStatus> {
    let mut statuses = Vec::with_capacity(DataSetKey::ALL.len());

    for key in DataSetKey::ALL {
      let value = self.slot(key).value.read().await;
      let status = match value.as_ref() {
        Some(published) => SlotStatus {
          key: key.name(),
          populated: true,
          connected: published.result.connected,
          item_count: published.result.items.len(),
          refreshed_at: Some(published.refreshed_at),
        },
        None => SlotStatus {
          key: key.name(),
          populated: false,
          connected: false,
          item_count: 0,
          refreshed_at: None,
        },
      };
      statuses.push(status);
    }

    statuses
  }
}
