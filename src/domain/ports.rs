use crate::error::Result;
use async_trait::async_trait;

/// Outcome of an atomic conditional subtraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckedSub {
    /// The subtraction was committed; carries the new value.
    Applied(i64),
    /// The value was left untouched because it would have gone negative;
    /// carries the value observed at the time of the check.
    Insufficient(i64),
}

/// Integer key-value store used by the ledger.
///
/// Every mutating method is atomic with respect to other mutators of the same
/// key. `atomic_add` and `checked_sub` require the key to exist and fail with
/// `NotFound` otherwise; a stored value that is not an integer is `Corrupt`.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool>;
    async fn get(&self, key: &str) -> Result<i64>;
    async fn set(&self, key: &str, value: i64) -> Result<()>;
    /// Writes `value` only if `key` is absent. Returns whether it wrote.
    async fn set_if_absent(&self, key: &str, value: i64) -> Result<bool>;
    async fn atomic_add(&self, key: &str, delta: i64) -> Result<i64>;
    async fn checked_sub(&self, key: &str, amount: i64) -> Result<CheckedSub>;
    /// All stored entries. Not a consistent snapshot across keys.
    async fn entries(&self) -> Result<Vec<(String, i64)>>;
    async fn ping(&self) -> Result<()>;
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub type KvStoreBox = Box<dyn KvStore>;
