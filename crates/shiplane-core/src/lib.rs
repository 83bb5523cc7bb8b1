//! shiplane-core — shared domain types for the shiplane pipeline.
//!
//! Everything that crosses a crate boundary lives here: image tags and
//! their release channels, content digests, promotion records, rollout
//! states, deployment references, and the TOML configuration.

pub mod config;
pub mod tag;
pub mod types;

pub use config::ShiplaneConfig;
pub use tag::{Channel, DerivePolicy, ImageTag, TagError};
pub use types::*;
