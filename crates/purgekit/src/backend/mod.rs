//! # Backend Adapters
//!
//! One adapter per cache backend. Each translates the generic status/purge
//! contract into the backend's native operations.

pub use self::adapter::BackendAdapter;
pub use self::cdn::CdnCacheAdapter;
pub use self::edge::{BoxError, EdgeCacheAdapter, PurgeHook};
pub use self::object::ObjectCacheAdapter;
pub use self::platform::PlatformOptimizationAdapter;
pub use self::types::{
    BackendKind, BackendState, BackendStatus, DEFAULT_SUCCESS_MESSAGE, FailureKind, PurgeOutcome,
};

// Adapter interface
pub mod adapter;
mod types;

// Individual adapters
pub mod cdn;
pub mod edge;
pub mod object;
pub mod platform;
