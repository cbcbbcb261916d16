use thiserror::Error;

/// Errors raised by the gateway core.
///
/// Verification and confirmation failures are listed here so callers can log
/// them uniformly, but the reconciler never lets them escape: they are turned
/// into rejected [`ReconcileResult`](crate::domain::notification::ReconcileResult)s.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Missing or unusable key material, or an invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Signing error: {0}")]
    SigningError(String),
    #[error("Verification error: {0}")]
    VerificationError(String),
    #[error("Confirmation failed: {0}")]
    ConfirmationFailed(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
