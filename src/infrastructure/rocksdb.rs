use crate::domain::ports::DraftStore;
use crate::domain::session::SessionSnapshot;
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing in-flight checkout drafts.
pub const CF_DRAFTS: &str = "drafts";

/// A persistent draft store using RocksDB.
///
/// Snapshots are stored as JSON under their session id, so a checkout that was
/// interrupted or failed can be resumed by a later run.
///
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBDraftStore {
    db: Arc<DB>,
}

impl RocksDBDraftStore {
    /// Opens or creates a RocksDB instance at `path`, creating the drafts column family
    /// if it is missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_drafts = ColumnFamilyDescriptor::new(CF_DRAFTS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_drafts])?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Every stored draft, in key order.
    pub fn all(&self) -> Result<Vec<SessionSnapshot>> {
        let cf = self.drafts_cf()?;
        let mut snapshots = Vec::new();
        for item in self.db.iterator_cf(&cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            snapshots.push(serde_json::from_slice(&value)?);
        }
        Ok(snapshots)
    }

    fn drafts_cf(&self) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(CF_DRAFTS)
            .ok_or_else(|| CheckoutError::Storage("drafts column family not found".to_string()))
    }
}

#[async_trait]
impl DraftStore for RocksDBDraftStore {
    async fn save(&self, snapshot: SessionSnapshot) -> Result<()> {
        let cf = self.drafts_cf()?;
        let value = serde_json::to_vec(&snapshot)?;
        self.db.put_cf(&cf, snapshot.session_id().as_bytes(), value)?;
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionSnapshot>> {
        let cf = self.drafts_cf()?;
        match self.db.get_cf(&cf, session_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, session_id: &str) -> Result<()> {
        let cf = self.drafts_cf()?;
        self.db.delete_cf(&cf, session_id.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderDraft;
    use crate::domain::session::{Amounts, PaymentMethod, PaymentSession, Step};
    use tempfile::tempdir;

    fn snapshot(id: &str) -> SessionSnapshot {
        let mut session = PaymentSession::new(id, Amounts::new(12000, 500, 0).unwrap(), 3);
        session.set_method(PaymentMethod::WalletTransfer);
        SessionSnapshot {
            session,
            step: Step::Confirmation,
            method_locked: true,
            draft: OrderDraft::default(),
        }
    }

    #[test]
    fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBDraftStore::open(dir.path()).expect("Failed to open RocksDB");
        assert!(store.db.cf_handle(CF_DRAFTS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_draft_store() {
        let dir = tempdir().unwrap();
        let store = RocksDBDraftStore::open(dir.path()).unwrap();

        store.save(snapshot("s-1")).await.unwrap();
        store.save(snapshot("s-2")).await.unwrap();

        let loaded = store.load("s-1").await.unwrap().unwrap();
        assert_eq!(loaded, snapshot("s-1"));
        assert_eq!(store.all().unwrap().len(), 2);

        store.remove("s-1").await.unwrap();
        assert!(store.load("s-1").await.unwrap().is_none());
        assert!(store.load("s-3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rocksdb_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDBDraftStore::open(dir.path()).unwrap();
            store.save(snapshot("s-1")).await.unwrap();
        }
        let store = RocksDBDraftStore::open(dir.path()).unwrap();
        assert_eq!(store.load("s-1").await.unwrap(), Some(snapshot("s-1")));
    }
}
