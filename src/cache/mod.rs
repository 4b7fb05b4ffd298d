//! In-memory snapshot cache refreshed in the background.
//!
//! This module provides:
//! - One slot per data set holding the last complete result
//! - Readers that wait for the first publish, then never wait again
//! - A refresh loop per data set that fetches, publishes and sleeps

mod scheduler;
mod store;
mod types;

pub use scheduler::{Fetcher, RefreshScheduler};
pub use store::CacheStore;
pub use types::{CacheResult, DataSetKey, Item, SlotStatus};
