//! Access to the Cloud Controller and UAA APIs.
//!
//! - Bearer token shared by all calls, obtained with the password grant
//! - One re-login per request when the token is rejected
//! - Cursor (`next_url`) and offset (`startIndex`) pagination

pub mod api_types;
mod client;
mod error;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{Credentials, Endpoints, RemoteClient};
pub use error::RemoteError;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
