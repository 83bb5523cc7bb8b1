//! shiplane-registry — container registry client.
//!
//! Speaks the OCI distribution v2 API: tag listing, manifest resolution,
//! digest-addressed pull, and conditional push (a tag can only be created
//! or re-pointed at the digest it already holds; anything else is a
//! conflict). An in-memory implementation backs tests and dry runs.
//!
//! Transient transport errors are retryable via [`retry::with_retry`];
//! everything else propagates unmodified.

pub mod client;
pub mod error;
pub mod http;
pub mod memory;
pub mod retry;

pub use client::{Registry, latest_dev_tag};
pub use error::{RegistryError, RegistryResult};
pub use http::HttpRegistry;
pub use memory::MemoryRegistry;
pub use retry::{RetryPolicy, with_retry};
