//! # CDN API
//!
//! Types for the CDN management API's "purge everything" call and the
//! transport used to issue it.

mod transport;
mod types;

pub use transport::{CdnTransport, HttpCdnTransport, create_client};
pub use types::{CdnApiError, CdnApiResponse, CdnCredentials};
