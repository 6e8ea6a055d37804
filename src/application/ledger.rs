use crate::domain::account::{AccountBalance, Amount, CreateOutcome, Username};
use crate::domain::ports::{CheckedSub, KvStoreBox};
use crate::error::{LedgerError, Result};
use tracing::{info, instrument, warn};

/// Per-user balance ledger over a key-value store.
///
/// The ledger owns the balance rules (explicit creation, non-negative
/// balances, non-negative amounts) and holds no state of its own: every call
/// goes to the store, and every mutation is a single atomic store operation,
/// so concurrent calls on one account are linearizable.
pub struct BalanceLedger {
    store: KvStoreBox,
}

impl BalanceLedger {
    pub fn new(store: KvStoreBox) -> Self {
        Self { store }
    }

    /// Creates the account with a zero balance if it does not exist yet.
    ///
    /// Creating an existing account is a no-op, never a reset: the write only
    /// happens if the key is still absent.
    #[instrument(skip(self, username), fields(username = %username))]
    pub async fn create_account(&self, username: &Username) -> Result<CreateOutcome> {
        let key = username.as_str();
        if self.store.exists(key).await? {
            return Ok(CreateOutcome::AlreadyExists);
        }
        if self.store.set_if_absent(key, 0).await? {
            info!("account created");
            Ok(CreateOutcome::Created)
        } else {
            Ok(CreateOutcome::AlreadyExists)
        }
    }

    /// Returns the balance, reading an absent account as zero.
    #[instrument(skip(self, username), fields(username = %username))]
    pub async fn get_balance(&self, username: &Username) -> Result<i64> {
        match self.store.get(username.as_str()).await {
            Ok(balance) => Ok(balance),
            Err(LedgerError::NotFound(_)) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Adds `amount` to an existing account and returns the new balance.
    #[instrument(skip(self, username), fields(username = %username))]
    pub async fn increment(&self, username: &Username, amount: i64) -> Result<i64> {
        let amount = Amount::new(amount)?;
        let balance = self
            .store
            .atomic_add(username.as_str(), amount.value())
            .await
            .map_err(|e| account_error(username, e))?;
        info!(amount = amount.value(), balance, "balance increased");
        Ok(balance)
    }

    /// Subtracts `amount` from an existing account and returns the new
    /// balance. Fails with `InsufficientFunds`, leaving the balance untouched,
    /// if the result would be negative.
    #[instrument(skip(self, username), fields(username = %username))]
    pub async fn decrement(&self, username: &Username, amount: i64) -> Result<i64> {
        let amount = Amount::new(amount)?;
        let outcome = self
            .store
            .checked_sub(username.as_str(), amount.value())
            .await
            .map_err(|e| account_error(username, e))?;

        match outcome {
            CheckedSub::Applied(balance) => {
                info!(amount = amount.value(), balance, "balance decreased");
                Ok(balance)
            }
            CheckedSub::Insufficient(balance) => {
                warn!(amount = amount.value(), balance, "insufficient funds");
                Err(LedgerError::InsufficientFunds {
                    username: username.to_string(),
                    balance,
                    requested: amount.value(),
                })
            }
        }
    }

    /// Every account with its balance, ordered by username.
    pub async fn accounts(&self) -> Result<Vec<AccountBalance>> {
        let mut accounts: Vec<AccountBalance> = self
            .store
            .entries()
            .await?
            .into_iter()
            .map(|(username, balance)| AccountBalance { username, balance })
            .collect();
        accounts.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(accounts)
    }

    /// Sum of all balances and the number of accounts it covers.
    pub async fn total(&self) -> Result<(i64, usize)> {
        let accounts = self.accounts().await?;
        let total = accounts.iter().try_fold(0i64, |sum, account| {
            sum.checked_add(account.balance)
                .ok_or_else(|| LedgerError::Overflow("total".to_string()))
        })?;
        Ok((total, accounts.len()))
    }

    pub async fn health(&self) -> Result<()> {
        self.store.ping().await
    }

    /// Releases the store. Call once, on shutdown.
    pub async fn close(&self) -> Result<()> {
        self.store.close().await
    }
}

fn account_error(username: &Username, err: LedgerError) -> LedgerError {
    match err {
        LedgerError::NotFound(_) => LedgerError::AccountNotFound(username.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::KvStore;
    use crate::infrastructure::in_memory::InMemoryKvStore;

    fn user(name: &str) -> Username {
        Username::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_ledger_walkthrough() {
        let ledger = BalanceLedger::new(Box::new(InMemoryKvStore::new()));
        let alice = user("alice");

        assert_eq!(
            ledger.create_account(&alice).await.unwrap(),
            CreateOutcome::Created
        );
        assert_eq!(ledger.get_balance(&alice).await.unwrap(), 0);
        assert_eq!(ledger.increment(&alice, 50).await.unwrap(), 50);
        assert_eq!(ledger.decrement(&alice, 20).await.unwrap(), 30);

        match ledger.decrement(&alice, 100).await {
            Err(LedgerError::InsufficientFunds {
                balance, requested, ..
            }) => {
                assert_eq!(balance, 30);
                assert_eq!(requested, 100);
            }
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }
        assert_eq!(ledger.get_balance(&alice).await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_create_does_not_reset_balance() {
        let ledger = BalanceLedger::new(Box::new(InMemoryKvStore::new()));
        let bob = user("bob");

        ledger.create_account(&bob).await.unwrap();
        ledger.increment(&bob, 10).await.unwrap();
        assert_eq!(
            ledger.create_account(&bob).await.unwrap(),
            CreateOutcome::AlreadyExists
        );
        assert_eq!(ledger.get_balance(&bob).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_negative_amount_never_reaches_store() {
        let store = InMemoryKvStore::new();
        store.set("carol", 5).await.unwrap();
        let ledger = BalanceLedger::new(Box::new(store.clone()));
        let carol = user("carol");

        assert!(matches!(
            ledger.increment(&carol, -1).await,
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            ledger.decrement(&carol, -1).await,
            Err(LedgerError::InvalidAmount(_))
        ));
        // Validation runs before the existence check.
        assert!(matches!(
            ledger.increment(&user("nobody"), -3).await,
            Err(LedgerError::InvalidAmount(_))
        ));
        assert_eq!(store.get("carol").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_missing_account_errors() {
        let ledger = BalanceLedger::new(Box::new(InMemoryKvStore::new()));
        let ghost = user("ghost");

        assert!(matches!(
            ledger.increment(&ghost, 1).await,
            Err(LedgerError::AccountNotFound(name)) if name == "ghost"
        ));
        assert!(matches!(
            ledger.decrement(&ghost, 0).await,
            Err(LedgerError::AccountNotFound(_))
        ));
        assert_eq!(ledger.get_balance(&ghost).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_balance_surfaces() {
        let store = InMemoryKvStore::new();
        store.insert_raw("dave", "NaN").await;
        let ledger = BalanceLedger::new(Box::new(store));
        let dave = user("dave");

        assert!(matches!(
            ledger.get_balance(&dave).await,
            Err(LedgerError::Corrupt { .. })
        ));
        assert!(matches!(
            ledger.increment(&dave, 1).await,
            Err(LedgerError::Corrupt { .. })
        ));
        assert!(matches!(
            ledger.create_account(&dave).await,
            Ok(CreateOutcome::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_accounts_and_total() {
        let ledger = BalanceLedger::new(Box::new(InMemoryKvStore::new()));
        for (name, amount) in [("zoe", 5), ("amy", 7), ("max", 0)] {
            let username = user(name);
            ledger.create_account(&username).await.unwrap();
            ledger.increment(&username, amount).await.unwrap();
        }

        let accounts = ledger.accounts().await.unwrap();
        let names: Vec<_> = accounts.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(names, vec!["amy", "max", "zoe"]);
        assert_eq!(ledger.total().await.unwrap(), (12, 3));
    }

    #[tokio::test]
    async fn test_total_overflow() {
        let store = InMemoryKvStore::new();
        store.set("a", i64::MAX).await.unwrap();
        store.set("b", 1).await.unwrap();
        let ledger = BalanceLedger::new(Box::new(store));

        assert!(matches!(
            ledger.total().await,
            Err(LedgerError::Overflow(_))
        ));
    }
}
