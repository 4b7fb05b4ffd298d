//! Background snapshot of Cloud Controller and UAA data.
//!
//! A [`cache::RefreshScheduler`] keeps one refresh loop per data set,
//! [`fetch::RemoteFetcher`] pulls pages through an authenticated
//! [`remote::RemoteClient`], and [`views::CacheView`] serves reads and
//! derived views from memory.

pub mod cache;
pub mod config;
pub mod fetch;
pub mod remote;
pub mod views;
