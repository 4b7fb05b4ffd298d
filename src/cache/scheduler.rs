//! Background refresh loops, one tokio task per data set.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use super::store::CacheStore;
use super::types::{CacheResult, DataSetKey};

/// Produces a complete result for a data set.
///
/// Implementations absorb their own failures: a fetch that goes wrong
/// returns [`CacheResult::disconnected`] instead of an error.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
  async fn fetch(&self, key: DataSetKey) -> CacheResult;
}

/// Drives a fetch/publish/wait loop for every data set.
pub struct RefreshScheduler<F: Fetcher> {
  fetcher: Arc<F>,
  store: Arc<CacheStore>,
  interval: Duration,
}

impl<F: Fetcher> RefreshScheduler<F> {
  pub fn new(fetcher: Arc<F>, store: Arc<CacheStore>, interval: Duration) -> Self {
    Self {
      fetcher,
      store,
      interval,
    }
  }

  /// Spawn one loop per key. The loops run until the runtime shuts down.
  pub fn spawn(&self) -> Vec<JoinHandle<()>> {
    DataSetKey::ALL
      .iter()
      .map(|&key| {
        let fetcher = self.fetcher.clone();
        let store = self.store.clone();
        let interval = self.interval;
        tokio::spawn(async move { run(key, fetcher, store, interval).await })
      })
      .collect()
  }
}

async fn run<F: Fetcher>(
  key: DataSetKey,
  fetcher: Arc<F>,
  store: Arc<CacheStore>,
  interval: Duration,
) {
  loop {
    debug!(
      "[{} second interval] Starting {} discovery...",
      interval.as_secs(),
      key
    );

    // No slot lock is held while fetching
    let result = fetcher.fetch(key).await;

    debug!("Caching {} data...", key);
    store.publish(key, result).await;

    store.wait_for_refresh(key, interval).await;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::collections::HashMap;
  use std::sync::Mutex;
  use tokio::time::timeout;

  /// Counts fetches per key; organizations always fail.
  #[derive(Default)]
  struct CountingFetcher {
    calls: Mutex<HashMap<DataSetKey, usize>>,
  }

  impl CountingFetcher {
    fn calls(&self, key: DataSetKey) -> usize {
      *self.calls.lock().unwrap().get(&key).unwrap_or(&0)
    }
  }

  #[async_trait]
  impl Fetcher for CountingFetcher {
    async fn fetch(&self, key: DataSetKey) -> CacheResult {
      let n = {
        let mut calls = self.calls.lock().unwrap();
        let n = calls.entry(key).or_insert(0);
        *n += 1;
        *n
      };

      if key == DataSetKey::Organizations {
        return CacheResult::disconnected();
      }

      let item = json!({"fetch": n}).as_object().unwrap().clone();
      CacheResult::from_network(vec![item])
    }
  }

  #[tokio::test]
  async fn test_every_key_gets_published() {
    let fetcher = Arc::new(CountingFetcher::default());
    let store = Arc::new(CacheStore::new());
    let handles =
      RefreshScheduler::new(fetcher.clone(), store.clone(), Duration::from_secs(3600)).spawn();

    for key in DataSetKey::ALL {
      let result = timeout(Duration::from_secs(1), store.get(key))
        .await
        .unwrap();
      assert_eq!(result.connected, key != DataSetKey::Organizations);
    }
    assert_eq!(fetcher.calls(DataSetKey::Spaces), 1);

    for handle in handles {
      handle.abort();
    }
  }

  #[tokio::test]
  async fn test_refreshes_on_interval() {
    let fetcher = Arc::new(CountingFetcher::default());
    let store = Arc::new(CacheStore::new());
    let handles =
      RefreshScheduler::new(fetcher.clone(), store.clone(), Duration::from_millis(20)).spawn();

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(fetcher.calls(DataSetKey::Applications) >= 3);
    let latest = store.get(DataSetKey::Applications).await;
    assert_ne!(latest.items[0]["fetch"], json!(1));

    for handle in handles {
      handle.abort();
    }
  }

  #[tokio::test]
  async fn test_request_refresh_wakes_loop() {
    let fetcher = Arc::new(CountingFetcher::default());
    let store = Arc::new(CacheStore::new());
    let handles =
      RefreshScheduler::new(fetcher.clone(), store.clone(), Duration::from_secs(3600)).spawn();

    store.get(DataSetKey::Spaces).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    store.request_refresh(DataSetKey::Spaces);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(fetcher.calls(DataSetKey::Spaces), 2);
    assert_eq!(fetcher.calls(DataSetKey::Applications), 1);

    for handle in handles {
      handle.abort();
    }
  }
}
