use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Key not found: {0}")]
    NotFound(String),
    #[error("Stored value for '{key}' is not an integer: {value:?}")]
    Corrupt { key: String, value: String },
    #[error("Update of '{key}' conflicted {attempts} times")]
    Conflict { key: String, attempts: u32 },
    #[error("Invalid amount {0}: amounts must be non-negative integers")]
    InvalidAmount(String),
    #[error("Invalid username: {0}")]
    InvalidUsername(String),
    #[error("Account '{0}' does not exist")]
    AccountNotFound(String),
    #[error("Insufficient funds for '{username}': balance {balance}, requested {requested}")]
    InsufficientFunds {
        username: String,
        balance: i64,
        requested: i64,
    },
    #[error("Balance of '{0}' would overflow")]
    Overflow(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl LedgerError {
    /// Stable machine-readable code, shared by the HTTP and CLI surfaces.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::StoreUnavailable(_) => "store_unavailable",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::Corrupt { .. } => "corrupt_balance",
            LedgerError::Conflict { .. } => "conflict",
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::InvalidUsername(_) => "invalid_username",
            LedgerError::AccountNotFound(_) => "account_not_found",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::Overflow(_) => "balance_overflow",
            LedgerError::Config(_) => "config_error",
            LedgerError::CsvError(_) => "csv_error",
            LedgerError::IoError(_) => "io_error",
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::StoreUnavailable(_) | LedgerError::Conflict { .. }
        )
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(e: rocksdb::Error) -> Self {
        LedgerError::StoreUnavailable(e.into_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
