//! redb table definitions for the promotion ledger.

use redb::TableDefinition;

/// Promotion records keyed by `{repo}@{stable_version}`.
pub const PROMOTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("promotions");
