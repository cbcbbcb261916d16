use crate::domain::transaction::Transaction;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct TransactionRow<'a> {
    id: u64,
    reference: &'a str,
    amount: String,
    currency: &'a str,
    state: &'static str,
    acquirer_reference: Option<&'a str>,
    validated_at: Option<String>,
    state_message: Option<&'a str>,
}

impl<'a> From<&'a Transaction> for TransactionRow<'a> {
    fn from(tx: &'a Transaction) -> Self {
        Self {
            id: tx.id,
            reference: &tx.reference,
            amount: tx.amount.to_wire(),
            currency: &tx.currency,
            state: tx.state.as_str(),
            acquirer_reference: tx.acquirer_reference.as_deref(),
            validated_at: tx
                .validated_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string()),
            state_message: tx.state_message.as_deref(),
        }
    }
}

/// Writes the reconciled state of transactions as CSV.
pub struct TransactionWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> TransactionWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_transactions<'a>(&mut self, transactions: impl IntoIterator<Item = &'a Transaction>) -> Result<()> {
        for tx in transactions {
            self.writer.serialize(TransactionRow::from(tx))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
