use crate::domain::account::{decode_balance, encode_balance};
use crate::domain::ports::{CheckedSub, KvStore};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory key-value store.
///
/// Values are kept as decimal strings, the same layout the remote stores use,
/// so corrupt-value handling behaves identically. Every mutation runs under
/// the write lock, which makes each one atomic.
#[derive(Default, Clone)]
pub struct InMemoryKvStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryKvStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a raw value without validation. Lets callers seed legacy or
    /// damaged data.
    pub async fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().await.insert(key.into(), value.into());
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.values.read().await.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<i64> {
        let values = self.values.read().await;
        match values.get(key) {
            Some(raw) => decode_balance(key, raw),
            None => Err(LedgerError::NotFound(key.to_string())),
        }
    }

    async fn set(&self, key: &str, value: i64) -> Result<()> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), encode_balance(value));
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: i64) -> Result<bool> {
        let mut values = self.values.write().await;
        if values.contains_key(key) {
            return Ok(false);
        }
        values.insert(key.to_string(), encode_balance(value));
        Ok(true)
    }

    async fn atomic_add(&self, key: &str, delta: i64) -> Result<i64> {
        let mut values = self.values.write().await;
        let slot = values
            .get_mut(key)
            .ok_or_else(|| LedgerError::NotFound(key.to_string()))?;
        let current = decode_balance(key, slot)?;
        let next = current
            .checked_add(delta)
            .ok_or_else(|| LedgerError::Overflow(key.to_string()))?;
        *slot = encode_balance(next);
        Ok(next)
    }

    async fn checked_sub(&self, key: &str, amount: i64) -> Result<CheckedSub> {
        let mut values = self.values.write().await;
        let slot = values
            .get_mut(key)
            .ok_or_else(|| LedgerError::NotFound(key.to_string()))?;
        let current = decode_balance(key, slot)?;
        match current.checked_sub(amount) {
            Some(next) if next >= 0 => {
                *slot = encode_balance(next);
                Ok(CheckedSub::Applied(next))
            }
            _ => Ok(CheckedSub::Insufficient(current)),
        }
    }

    async fn entries(&self) -> Result<Vec<(String, i64)>> {
        let values = self.values.read().await;
        values
            .iter()
            .map(|(key, raw)| Ok((key.clone(), decode_balance(key, raw)?)))
            .collect()
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
