use crate::domain::account::{decode_balance, encode_balance};
use crate::domain::ports::{CheckedSub, KvStore};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{Direction, ErrorKind, IteratorMode, OptimisticTransactionDB, Options};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// What an optimistic update decided after inspecting the current value.
enum Step<T> {
    /// Write the new value and return `T` once the commit succeeds.
    Write(i64, T),
    /// Leave the key untouched and return `T`.
    Keep(T),
}

/// A persistent store implementation using RocksDB.
///
/// Read-modify-write operations run inside optimistic transactions: the key is
/// read with `get_for_update`, and a commit that races with another writer is
/// rejected by RocksDB and retried, up to `max_attempts` times. Exhausting the
/// attempts surfaces `Conflict` instead of dropping the update.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc`).
#[derive(Clone)]
pub struct RocksDbKvStore {
    db: Arc<OptimisticTransactionDB>,
    prefix: String,
    max_attempts: u32,
}

impl RocksDbKvStore {
    /// Opens or creates a database at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    /// * `prefix` - Prepended to every key.
    /// * `max_attempts` - Commit attempts per update before giving up.
    pub fn open<P: AsRef<Path>>(
        path: P,
        prefix: impl Into<String>,
        max_attempts: u32,
    ) -> Result<Self> {
        if max_attempts == 0 {
            return Err(LedgerError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = OptimisticTransactionDB::open(&opts, path)?;

        Ok(Self {
            db: Arc::new(db),
            prefix: prefix.into(),
            max_attempts,
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn read(&self, key: &str) -> Result<Option<i64>> {
        match self.db.get(self.key(key))? {
            Some(bytes) => decode_bytes(key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Runs `decide` against the current value of `key` inside an optimistic
    /// transaction, retrying when the commit conflicts.
    fn update<T>(
        &self,
        key: &str,
        mut decide: impl FnMut(Option<i64>) -> Result<Step<T>>,
    ) -> Result<T> {
        let full_key = self.key(key);
        for attempt in 1..=self.max_attempts {
            let txn = self.db.transaction();
            let current = match txn.get_for_update(&full_key, true)? {
                Some(bytes) => Some(decode_bytes(key, &bytes)?),
                None => None,
            };

            let (next, outcome) = match decide(current)? {
                Step::Keep(outcome) => return Ok(outcome),
                Step::Write(next, outcome) => (next, outcome),
            };

            txn.put(&full_key, encode_balance(next))?;
            match txn.commit() {
                Ok(()) => return Ok(outcome),
                Err(e) if matches!(e.kind(), ErrorKind::Busy | ErrorKind::TryAgain) => {
                    debug!(key, attempt, "optimistic commit conflicted, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(key, attempts = self.max_attempts, "giving up after repeated conflicts");
        Err(LedgerError::Conflict {
            key: key.to_string(),
            attempts: self.max_attempts,
        })
    }
}

fn decode_bytes(key: &str, bytes: &[u8]) -> Result<i64> {
    match std::str::from_utf8(bytes) {
        Ok(raw) => decode_balance(key, raw),
        Err(_) => Err(LedgerError::Corrupt {
            key: key.to_string(),
            value: String::from_utf8_lossy(bytes).into_owned(),
        }),
    }
}

#[async_trait]
impl KvStore for RocksDbKvStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        // Just check if the key exists without copying the value out
        Ok(self.db.get_pinned(self.key(key))?.is_some())
    }

    async fn get(&self, key: &str) -> Result<i64> {
        self.read(key)?
            .ok_or_else(|| LedgerError::NotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: i64) -> Result<()> {
        self.db.put(self.key(key), encode_balance(value))?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: i64) -> Result<bool> {
        self.update(key, |current| {
            Ok(match current {
                Some(_) => Step::Keep(false),
                None => Step::Write(value, true),
            })
        })
    }

    async fn atomic_add(&self, key: &str, delta: i64) -> Result<i64> {
        self.update(key, |current| {
            let current = current.ok_or_else(|| LedgerError::NotFound(key.to_string()))?;
            let next = current
                .checked_add(delta)
                .ok_or_else(|| LedgerError::Overflow(key.to_string()))?;
            Ok(Step::Write(next, next))
        })
    }

    async fn checked_sub(&self, key: &str, amount: i64) -> Result<CheckedSub> {
        self.update(key, |current| {
            let current = current.ok_or_else(|| LedgerError::NotFound(key.to_string()))?;
            Ok(match current.checked_sub(amount) {
                Some(next) if next >= 0 => Step::Write(next, CheckedSub::Applied(next)),
                _ => Step::Keep(CheckedSub::Insufficient(current)),
            })
        })
    }

    async fn entries(&self) -> Result<Vec<(String, i64)>> {
        let mut entries = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(self.prefix.as_bytes(), Direction::Forward));

        for item in iter {
            let (full_key, value) = item?;
            let Some(key) = full_key.strip_prefix(self.prefix.as_bytes()) else {
                break;
            };
            let key = String::from_utf8_lossy(key).into_owned();
            let balance = decode_bytes(&key, &value)?;
            entries.push((key, balance));
        }

        Ok(entries)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
