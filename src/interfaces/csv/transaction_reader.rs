use crate::domain::amount::Amount;
use crate::domain::transaction::Transaction;
use crate::error::{GatewayError, Result};
use serde::Deserialize;
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
struct TransactionRecord {
    id: u64,
    reference: String,
    amount: String,
    #[serde(default)]
    currency: Option<String>,
}

/// Reads pending transactions from a CSV source with the header
/// `id, reference, amount[, currency]`.
///
/// Whitespace is trimmed and the currency column may be omitted, in which
/// case the reader's default applies.
pub struct TransactionReader<R: Read> {
    reader: csv::Reader<R>,
    default_currency: String,
}

impl<R: Read> TransactionReader<R> {
    pub fn new(source: R, default_currency: impl Into<String>) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self {
            reader,
            default_currency: default_currency.into(),
        }
    }

    /// Lazily reads and validates transactions, one `Result` per row.
    pub fn transactions(self) -> impl Iterator<Item = Result<Transaction>> {
        let default_currency = self.default_currency;
        self.reader
            .into_deserialize::<TransactionRecord>()
            .map(move |record| {
                let record = record.map_err(GatewayError::from)?;
                let amount = Amount::from_str(&record.amount)?;
                let currency = record
                    .currency
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| default_currency.clone());
                Ok(Transaction::pending(record.id, record.reference, amount, currency))
            })
    }
}
