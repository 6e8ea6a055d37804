use crate::domain::account::decode_balance;
use crate::domain::ports::{CheckedSub, KvStore};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError, Script};
use tracing::{debug, info};

/// Keys fetched per MGET round trip in [`RedisKvStore::entries`].
const MGET_CHUNK: usize = 256;
const SCAN_COUNT: usize = 500;

// Both scripts reply with a `{status, payload}` pair:
//   0 = key absent, -1 = stored value is not an integer (payload = raw value),
//   1 = committed (payload = new value), 2 = insufficient (payload = current).
// Payloads are read back with GET so large values never pass through Lua's
// floating point numbers.
const ADD_SCRIPT: &str = r"
local v = redis.call('GET', KEYS[1])
if not v then return {0, ''} end
if v ~= '0' and not string.match(v, '^%-?[1-9]%d*$') then return {-1, v} end
redis.call('INCRBY', KEYS[1], ARGV[1])
return {1, redis.call('GET', KEYS[1])}
";

const CHECKED_SUB_SCRIPT: &str = r"
local v = redis.call('GET', KEYS[1])
if not v then return {0, ''} end
if v ~= '0' and not string.match(v, '^%-?[1-9]%d*$') then return {-1, v} end
local r = redis.call('DECRBY', KEYS[1], ARGV[1])
if r < 0 then
  redis.call('INCRBY', KEYS[1], ARGV[1])
  return {2, v}
end
return {1, redis.call('GET', KEYS[1])}
";

/// Key-value store backed by a Redis server.
///
/// Atomic read-modify-write is delegated to server-side Lua scripts, which
/// Redis executes without interleaving other commands. The connection manager
/// reconnects on its own and is cheap to clone, so concurrent requests share
/// one multiplexed connection.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: ConnectionManager,
    prefix: String,
    add: Script,
    checked_sub: Script,
}

impl RedisKvStore {
    /// Connects to `url` and verifies the server answers `PING`.
    ///
    /// `prefix` is prepended to every key; an empty prefix keeps the legacy
    /// layout where the key is the bare username. Use a dedicated database
    /// index in the URL (e.g. `redis://localhost:6379/15`) to isolate tests.
    pub async fn open(url: &str, prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| LedgerError::Config(format!("invalid Redis URL: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| LedgerError::StoreUnavailable(e.to_string()))?;

        let store = Self {
            conn,
            prefix: prefix.into(),
            add: Script::new(ADD_SCRIPT),
            checked_sub: Script::new(CHECKED_SUB_SCRIPT),
        };
        store.ping().await?;
        info!(prefix = %store.prefix, "connected to Redis");
        Ok(store)
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn run_script(&self, script: &Script, key: &str, arg: i64) -> Result<(i64, String)> {
        let mut conn = self.conn.clone();
        script
            .key(self.key(key))
            .arg(arg)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| classify(key, e))
    }
}

/// Maps a Redis error on `key` onto the ledger taxonomy.
fn classify(key: &str, err: RedisError) -> LedgerError {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("overflow") {
        LedgerError::Overflow(key.to_string())
    } else if lower.contains("wrongtype") || lower.contains("not an integer") {
        LedgerError::Corrupt {
            key: key.to_string(),
            value: message,
        }
    } else {
        LedgerError::StoreUnavailable(message)
    }
}

fn script_outcome(key: &str, status: i64, payload: String) -> Result<i64> {
    match status {
        0 => Err(LedgerError::NotFound(key.to_string())),
        -1 => Err(LedgerError::Corrupt {
            key: key.to_string(),
            value: payload,
        }),
        _ => decode_balance(key, &payload),
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.exists(self.key(key))
            .await
            .map_err(|e| classify(key, e))
    }

    async fn get(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.key(key)).await.map_err(|e| classify(key, e))?;
        match raw {
            Some(raw) => decode_balance(key, &raw),
            None => Err(LedgerError::NotFound(key.to_string())),
        }
    }

    async fn set(&self, key: &str, value: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(self.key(key), value)
            .await
            .map_err(|e| classify(key, e))
    }

    async fn set_if_absent(&self, key: &str, value: i64) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.set_nx(self.key(key), value)
            .await
            .map_err(|e| classify(key, e))
    }

    async fn atomic_add(&self, key: &str, delta: i64) -> Result<i64> {
        let (status, payload) = self.run_script(&self.add, key, delta).await?;
        script_outcome(key, status, payload)
    }

    async fn checked_sub(&self, key: &str, amount: i64) -> Result<CheckedSub> {
        let (status, payload) = self.run_script(&self.checked_sub, key, amount).await?;
        let value = script_outcome(key, status, payload)?;
        if status == 2 {
            debug!(key, current = value, amount, "conditional subtraction refused");
            Ok(CheckedSub::Insufficient(value))
        } else {
            Ok(CheckedSub::Applied(value))
        }
    }

    async fn entries(&self) -> Result<Vec<(String, i64)>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", self.prefix);
        let mut keys: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .map_err(|e| LedgerError::StoreUnavailable(e.to_string()))?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may return a key more than once.
        keys.sort_unstable();
        keys.dedup();

        let mut entries = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(MGET_CHUNK) {
            // Explicit MGET: a single-key `get` would issue GET and change the reply shape.
            let values: Vec<Option<String>> = redis::cmd("MGET")
                .arg(chunk)
                .query_async(&mut conn)
                .await
                .map_err(|e| LedgerError::StoreUnavailable(e.to_string()))?;
            for (full_key, raw) in chunk.iter().zip(values) {
                let key = full_key
                    .strip_prefix(self.prefix.as_str())
                    .unwrap_or(full_key);
                // Deleted between SCAN and MGET.
                let Some(raw) = raw else { continue };
                entries.push((key.to_string(), decode_balance(key, &raw)?));
            }
        }
        Ok(entries)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| LedgerError::StoreUnavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_outcome_mapping() {
        assert!(matches!(
            script_outcome("alice", 0, String::new()),
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            script_outcome("alice", -1, "abc".into()),
            Err(LedgerError::Corrupt { .. })
        ));
        assert_eq!(script_outcome("alice", 1, "42".into()).unwrap(), 42);
        assert_eq!(script_outcome("alice", 2, "7".into()).unwrap(), 7);
    }

    #[test]
    fn test_classify_errors() {
        let overflow = RedisError::from((
            redis::ErrorKind::ResponseError,
            "script error",
            "increment or decrement would overflow".to_string(),
        ));
        assert!(matches!(
            classify("alice", overflow),
            LedgerError::Overflow(_)
        ));

        let io = RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(matches!(
            classify("alice", io),
            LedgerError::StoreUnavailable(_)
        ));
    }
}
