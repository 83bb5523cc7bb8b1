//! Ledger — redb-backed promotion audit log.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use shiplane_core::PromotionRecord;

use crate::error::{LedgerError, LedgerResult};
use crate::tables::PROMOTIONS;

/// Convert any `Display` error into a `LedgerError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| LedgerError::$variant(e.to_string())
    };
}

/// Table key for a record: `{repo}@{stable_version}`.
fn record_key(record: &PromotionRecord) -> String {
    match record.stable_tag.rsplit_once(':') {
        Some((repo, version)) => format!("{repo}@{version}"),
        None => record.stable_tag.clone(),
    }
}

/// Thread-safe, append-only promotion ledger.
#[derive(Clone)]
pub struct Ledger {
    db: Arc<Database>,
}

impl Ledger {
    /// Open (or create) a persistent ledger at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let ledger = Self { db: Arc::new(db) };
        ledger.ensure_tables()?;
        debug!(?path, "promotion ledger opened");
        Ok(ledger)
    }

    /// Create an ephemeral in-memory ledger (for testing).
    pub fn open_in_memory() -> LedgerResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let ledger = Self { db: Arc::new(db) };
        ledger.ensure_tables()?;
        Ok(ledger)
    }

    /// Create the table if it doesn't exist yet.
    fn ensure_tables(&self) -> LedgerResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(PROMOTIONS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Append a promotion record.
    ///
    /// Re-appending an identical record is a no-op. Appending a record
    /// that differs from the stored one fails: records are immutable.
    pub fn append(&self, record: &PromotionRecord) -> LedgerResult<()> {
        let key = record_key(record);

        if let Some(existing) = self.get(&key)? {
            if existing == *record {
                return Ok(());
            }
            return Err(LedgerError::Immutable(key));
        }

        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(PROMOTIONS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, outcome = ?record.outcome, "promotion recorded");
        Ok(())
    }

    /// Get a record by its `{repo}@{stable_version}` key.
    pub fn get(&self, key: &str) -> LedgerResult<Option<PromotionRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PROMOTIONS).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: PromotionRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Look up the record for a stable tag like `app:1.2.0`.
    pub fn get_for_stable_tag(&self, stable_tag: &str) -> LedgerResult<Option<PromotionRecord>> {
        let key = match stable_tag.rsplit_once(':') {
            Some((repo, version)) => format!("{repo}@{version}"),
            None => stable_tag.to_string(),
        };
        self.get(&key)
    }

    /// List all records for a repository, in key order.
    pub fn list_for_repo(&self, repo: &str) -> LedgerResult<Vec<PromotionRecord>> {
        let prefix = format!("{repo}@");
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PROMOTIONS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(&prefix) {
                let record: PromotionRecord =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(record);
            }
        }
        Ok(results)
    }

    /// List every record in the ledger.
    pub fn list_all(&self) -> LedgerResult<Vec<PromotionRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PROMOTIONS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: PromotionRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiplane_core::{Digest, PromotionOutcome};

    fn record(stable: &str) -> PromotionRecord {
        PromotionRecord {
            source_tag: format!("{stable}-dev1"),
            stable_tag: stable.to_string(),
            digest: Digest::of(stable.as_bytes()),
            promoted_at: 1_700_000_000,
            outcome: PromotionOutcome::Promoted,
        }
    }

    #[test]
    fn append_and_get() {
        let ledger = Ledger::open_in_memory().unwrap();
        let r = record("app:1.2.0");
        ledger.append(&r).unwrap();

        let found = ledger.get("app@1.2.0").unwrap().unwrap();
        assert_eq!(found, r);
        assert_eq!(ledger.get_for_stable_tag("app:1.2.0").unwrap(), Some(r));
    }

    #[test]
    fn identical_reappend_is_noop() {
        let ledger = Ledger::open_in_memory().unwrap();
        let r = record("app:1.2.0");
        ledger.append(&r).unwrap();
        ledger.append(&r).unwrap();
        assert_eq!(ledger.list_all().unwrap().len(), 1);
    }

    #[test]
    fn differing_reappend_is_rejected() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger.append(&record("app:1.2.0")).unwrap();

        let mut changed = record("app:1.2.0");
        changed.digest = Digest::of(b"something else");
        let err = ledger.append(&changed).unwrap_err();
        assert!(matches!(err, LedgerError::Immutable(_)));
    }

    #[test]
    fn list_for_repo_scans_prefix() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger.append(&record("app:1.0.0")).unwrap();
        ledger.append(&record("app:1.1.0")).unwrap();
        ledger.append(&record("other:2.0.0")).unwrap();

        let records = ledger.list_for_repo("app").unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.stable_tag.starts_with("app:")));
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.redb");

        {
            let ledger = Ledger::open(&path).unwrap();
            ledger.append(&record("app:3.0.0")).unwrap();
        }

        let ledger = Ledger::open(&path).unwrap();
        assert!(ledger.get("app@3.0.0").unwrap().is_some());
    }
}
