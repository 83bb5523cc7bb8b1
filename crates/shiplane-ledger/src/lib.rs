//! shiplane-ledger — append-only audit log of promotions.
//!
//! Backed by [redb](https://docs.rs/redb). Records are JSON-serialized
//! into a `&str` → `&[u8]` table keyed `{repo}@{stable_version}`. A record
//! is written once and never mutated; re-appending an identical record is
//! a no-op, re-appending a different one is an error.
//!
//! The `Ledger` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and supports on-disk and in-memory backends (the latter for testing).

pub mod error;
pub mod store;
pub mod tables;

pub use error::{LedgerError, LedgerResult};
pub use store::Ledger;
