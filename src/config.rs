//! Store configuration and backend selection.

use crate::domain::ports::KvStoreBox;
use crate::error::{LedgerError, Result};
use crate::infrastructure::in_memory::InMemoryKvStore;
use crate::infrastructure::redis::RedisKvStore;
use clap::Args;
use std::path::PathBuf;
use tracing::{info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Where balances live. Shared by every CLI subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct StoreConfig {
    /// Redis connection URL, e.g. redis://localhost:6379/0
    #[arg(long, env = "REDIS_URL", global = true)]
    pub redis_url: Option<String>,

    /// Path to an embedded persistent database (requires the storage-rocksdb feature)
    #[arg(long, env = "LEDGER_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Prefix prepended to every balance key
    #[arg(long, env = "LEDGER_KEY_PREFIX", default_value = "", global = true)]
    pub key_prefix: String,

    /// Commit attempts per balance update before reporting a conflict
    #[arg(long, env = "LEDGER_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS, global = true)]
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Redis(String),
    RocksDb(PathBuf),
    InMemory,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(LedgerError::Config(
                "max attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolves the backend: Redis, then the embedded database, then memory.
    pub fn backend(&self) -> Backend {
        if let Some(url) = &self.redis_url {
            return Backend::Redis(url.clone());
        }
        match &self.db_path {
            Some(path) if cfg!(feature = "storage-rocksdb") => Backend::RocksDb(path.clone()),
            Some(_) => {
                warn!(
                    "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
                );
                Backend::InMemory
            }
            None => Backend::InMemory,
        }
    }

    /// Opens the configured store. The store is reachable when this returns.
    pub async fn open_store(&self) -> Result<KvStoreBox> {
        self.validate()?;
        let store: KvStoreBox = match self.backend() {
            Backend::Redis(url) => {
                Box::new(RedisKvStore::open(&url, self.key_prefix.clone()).await?)
            }
            Backend::RocksDb(path) => self.open_rocksdb(path)?,
            Backend::InMemory => {
                info!("using in-memory storage; balances are lost on exit");
                Box::new(InMemoryKvStore::new())
            }
        };
        Ok(store)
    }

    #[cfg(feature = "storage-rocksdb")]
    fn open_rocksdb(&self, path: PathBuf) -> Result<KvStoreBox> {
        use crate::infrastructure::rocksdb::RocksDbKvStore;

        info!(path = %path.display(), "opening embedded database");
        Ok(Box::new(RocksDbKvStore::open(
            path,
            self.key_prefix.clone(),
            self.max_attempts,
        )?))
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    fn open_rocksdb(&self, path: PathBuf) -> Result<KvStoreBox> {
        Err(LedgerError::Config(format!(
            "cannot open {}: built without storage-rocksdb",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_resolution() {
        let config = StoreConfig {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            ..Default::default()
        };
        assert_eq!(config.backend(), Backend::InMemory);

        let config = StoreConfig {
            redis_url: Some("redis://localhost:6379/15".into()),
            db_path: Some(PathBuf::from("ignored")),
            ..config
        };
        assert_eq!(
            config.backend(),
            Backend::Redis("redis://localhost:6379/15".into())
        );
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    #[test]
    fn test_db_path_without_feature_falls_back() {
        let config = StoreConfig {
            db_path: Some(PathBuf::from("some_db")),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            ..Default::default()
        };
        assert_eq!(config.backend(), Backend::InMemory);
    }

    #[tokio::test]
    async fn test_zero_attempts_is_rejected() {
        let config = StoreConfig::default();
        assert!(matches!(
            config.open_store().await,
            Err(LedgerError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_redis_url_is_config_error() {
        let config = StoreConfig {
            redis_url: Some("not a url".into()),
            max_attempts: 1,
            ..Default::default()
        };
        assert!(matches!(
            config.open_store().await,
            Err(LedgerError::Config(_))
        ));
    }
}
