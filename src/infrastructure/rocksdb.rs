use crate::domain::ports::TransactionStore;
use crate::domain::transaction::Transaction;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing transactions.
pub const CF_TRANSACTIONS: &str = "transactions";

/// A persistent transaction store backed by RocksDB.
///
/// Keys are big-endian ids, so iteration order is id order. Values are JSON.
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path`, creating the
    /// transactions column family if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_transactions = ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_transactions])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn transactions_cf(&self) -> Result<&ColumnFamily> {
        self.db.cf_handle(CF_TRANSACTIONS).ok_or_else(|| {
            GatewayError::StorageError("Transactions column family not found".to_string())
        })
    }

    fn scan(&self) -> Result<Vec<Transaction>> {
        let cf = self.transactions_cf()?;
        let mut transactions = Vec::new();

        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let tx: Transaction = serde_json::from_slice(&value).map_err(|e| {
                GatewayError::StorageError(format!("Failed to deserialize transaction: {}", e))
            })?;
            transactions.push(tx);
        }

        Ok(transactions)
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn store(&self, tx: Transaction) -> Result<()> {
        let cf = self.transactions_cf()?;
        let value = serde_json::to_vec(&tx).map_err(|e| {
            GatewayError::StorageError(format!("Failed to serialize transaction: {}", e))
        })?;

        self.db.put_cf(cf, tx.id.to_be_bytes(), value)?;
        Ok(())
    }

    async fn get(&self, id: u64) -> Result<Option<Transaction>> {
        let cf = self.transactions_cf()?;

        match self.db.get_cf(cf, id.to_be_bytes())? {
            Some(bytes) => {
                let tx = serde_json::from_slice(&bytes).map_err(|e| {
                    GatewayError::StorageError(format!("Failed to deserialize transaction: {}", e))
                })?;
                Ok(Some(tx))
            }
            None => Ok(None),
        }
    }

    // No secondary index on reference; notifications are rare enough for a scan.
    async fn find_by_reference(&self, reference: &str) -> Result<Vec<Transaction>> {
        Ok(self
            .scan()?
            .into_iter()
            .filter(|tx| tx.reference == reference)
            .collect())
    }

    async fn get_all(&self) -> Result<Vec<Transaction>> {
        self.scan()
    }
}
