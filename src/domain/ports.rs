use super::transaction::Transaction;
use crate::error::Result;
use async_trait::async_trait;

/// The host's transaction lookup/update capability.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Inserts or replaces a transaction by id.
    async fn store(&self, tx: Transaction) -> Result<()>;
    async fn get(&self, id: u64) -> Result<Option<Transaction>>;
    /// Every transaction carrying `reference`. More than one match is a data
    /// problem the reconciler reports instead of guessing.
    async fn find_by_reference(&self, reference: &str) -> Result<Vec<Transaction>>;
    /// All transactions, ordered by id.
    async fn get_all(&self) -> Result<Vec<Transaction>>;
}

/// Server-to-server confirmation of a legacy notification.
#[async_trait]
pub trait ConfirmationClient: Send + Sync {
    /// Asks the acquirer whether `notify_id` is genuine and returns the
    /// response body (`true`, `false` or `invalid`).
    async fn confirm(&self, notify_id: &str) -> Result<String>;
}

pub type TransactionStoreBox = Box<dyn TransactionStore>;
pub type ConfirmationClientBox = Box<dyn ConfirmationClient>;
