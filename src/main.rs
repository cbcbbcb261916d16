use alipay_gateway::application::reconciler::NotificationReconciler;
use alipay_gateway::application::request_builder::{BusinessFields, RequestBuilder};
use alipay_gateway::config::AcquirerConfig;
use alipay_gateway::domain::amount::Amount;
use alipay_gateway::domain::notification::return_target;
use alipay_gateway::domain::ports::{TransactionStore, TransactionStoreBox};
use alipay_gateway::domain::protocol::Protocol;
use alipay_gateway::infrastructure::http_confirm::HttpConfirmationClient;
use alipay_gateway::infrastructure::in_memory::InMemoryTransactionStore;
#[cfg(feature = "storage-rocksdb")]
use alipay_gateway::infrastructure::rocksdb::RocksDBStore;
use alipay_gateway::interfaces::csv::transaction_reader::TransactionReader;
use alipay_gateway::interfaces::csv::transaction_writer::TransactionWriter;
use alipay_gateway::interfaces::form::{parse_form, redirect_url};
use alipay_gateway::logging::init_logging;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Acquirer account configuration (TOML)
    #[arg(long, short)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a signed payment request and print the gateway redirect URL
    Request {
        /// Merchant reference (`out_trade_no`)
        #[arg(long)]
        reference: String,

        /// Order amount before fees. The amount charged (and expected back in
        /// notifications) is this plus fees, rounded to cents.
        #[arg(long)]
        amount: Amount,

        /// Buyer country code, used to pick domestic or international fees
        #[arg(long)]
        buyer_country: Option<String>,

        #[arg(long)]
        body: Option<String>,
    },
    /// Reconcile notifications, one form-encoded body per line, printing
    /// `success` or `fail` for each
    Notify {
        /// File of form-encoded notifications
        notifications: PathBuf,

        /// Pending transactions CSV (`id,reference,amount[,currency]`). The
        /// amount is the charged total, fees included.
        #[arg(long)]
        transactions: Option<PathBuf>,

        /// Path to persistent database (optional). If provided, uses RocksDB.
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Skip the remote confirmation of legacy notifications
        #[arg(long)]
        no_confirm: bool,

        /// Treat lines as return redirects: no confirmation, print the
        /// redirect target instead of the acknowledgement
        #[arg(long)]
        returns: bool,

        /// Write the final transaction states as CSV
        #[arg(long)]
        state_out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AcquirerConfig::load(&cli.config).into_diagnostic()?;
    init_logging(&config.logging.level, config.logging.format);

    match cli.command {
        Command::Request {
            reference,
            amount,
            buyer_country,
            body,
        } => request(&config, &reference, amount, buyer_country.as_deref(), body),
        Command::Notify {
            notifications,
            transactions,
            db_path,
            no_confirm,
            returns,
            state_out,
        } => {
            let store = open_store(db_path.as_deref())?;
            if let Some(path) = transactions {
                load_transactions(store.as_ref(), &path, &config.currency).await?;
            }

            let mut reconciler = NotificationReconciler::new(config.clone(), store);
            if config.protocol == Protocol::Legacy && !no_confirm && !returns {
                let confirmer = HttpConfirmationClient::from_config(&config).into_diagnostic()?;
                reconciler = reconciler.with_confirmer(Box::new(confirmer));
            }

            notify(&reconciler, &notifications, returns).await?;

            if let Some(path) = state_out {
                let all = reconciler.store().get_all().await.into_diagnostic()?;
                let file = File::create(path).into_diagnostic()?;
                TransactionWriter::new(file)
                    .write_transactions(&all)
                    .into_diagnostic()?;
            }
            Ok(())
        }
    }
}

fn request(
    config: &AcquirerConfig,
    reference: &str,
    amount: Amount,
    buyer_country: Option<&str>,
    body: Option<String>,
) -> Result<()> {
    let fees = config
        .fees
        .compute(amount.value(), config.country.as_deref(), buyer_country)
        .into_diagnostic()?;
    let total = amount.with_surcharge(fees).into_diagnostic()?;
    if !fees.is_zero() {
        info!(reference, %fees, total = %total.to_wire(), "Applied acquirer fees");
    }

    let mut fields = BusinessFields::for_order(reference, total, config.company_name.as_deref());
    if let Some(body) = body {
        fields = fields.with_body(body);
    }

    let params = RequestBuilder::new(config).build(fields).into_diagnostic()?;
    let gateway = config.gateway_url().into_diagnostic()?;
    println!("{}", redirect_url(&gateway, &params));
    Ok(())
}

fn open_store(db_path: Option<&Path>) -> Result<TransactionStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Box::new(RocksDBStore::open(path).into_diagnostic()?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryTransactionStore::new()))
        }
        None => Ok(Box::new(InMemoryTransactionStore::new())),
    }
}

async fn load_transactions(
    store: &dyn TransactionStore,
    path: &Path,
    default_currency: &str,
) -> Result<()> {
    let file = File::open(path).into_diagnostic()?;
    for tx in TransactionReader::new(file, default_currency).transactions() {
        match tx {
            // Rows already in a persistent store keep their reconciled state.
            Ok(tx) => match store.get(tx.id).await.into_diagnostic()? {
                Some(_) => {}
                None => store.store(tx).await.into_diagnostic()?,
            },
            Err(e) => error!(error = %e, "Error reading transaction"),
        }
    }
    Ok(())
}

async fn notify(reconciler: &NotificationReconciler, path: &Path, returns: bool) -> Result<()> {
    let contents = std::fs::read_to_string(path).into_diagnostic()?;

    for line in contents.lines().filter(|line| !line.trim().is_empty()) {
        let params = parse_form(line);
        if returns {
            let result = reconciler.reconcile_return(&params).await.into_diagnostic()?;
            info!(accepted = result.accepted, reason = %result.reason, "Processed return");
            println!("{}", return_target(&params));
        } else {
            let result = reconciler.reconcile(&params).await.into_diagnostic()?;
            println!("{}", result.ack());
        }
    }
    Ok(())
}
