use crate::error::{LedgerError, Result};
use serde::Serialize;
use std::fmt;

const MAX_USERNAME_LEN: usize = 128;

/// A validated account identifier.
///
/// Usernames double as store keys, so anything that would make a key ambiguous
/// or unprintable (whitespace, control characters) is rejected up front.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(LedgerError::InvalidUsername(
                "username must not be empty".to_string(),
            ));
        }
        if value.len() > MAX_USERNAME_LEN {
            return Err(LedgerError::InvalidUsername(format!(
                "username longer than {} bytes",
                MAX_USERNAME_LEN
            )));
        }
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(LedgerError::InvalidUsername(format!(
                "{:?} contains whitespace or control characters",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Username {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for Username {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

/// A non-negative amount for increments and decrements.
///
/// The direction of a balance change is carried by the operation, never by
/// the sign of the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(value: i64) -> Result<Self> {
        if value >= 0 {
            Ok(Self(value))
        } else {
            Err(LedgerError::InvalidAmount(value.to_string()))
        }
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = LedgerError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Result of a create request. Both outcomes are successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

impl CreateOutcome {
    pub fn created(&self) -> bool {
        matches!(self, CreateOutcome::Created)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    pub username: String,
    pub balance: i64,
}

/// Parses a stored balance.
///
/// Only the canonical form written by [`encode_balance`] is accepted: an
/// optional `-` followed by digits without leading zeros. This is the same
/// set of strings Redis `INCRBY` treats as integers, so every backend agrees
/// on what is corrupt.
pub fn decode_balance(key: &str, raw: &str) -> Result<i64> {
    let corrupt = || LedgerError::Corrupt {
        key: key.to_string(),
        value: raw.to_string(),
    };
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let canonical = match digits.as_bytes() {
        // "0" is canonical, "-0" is not.
        [b'0'] => digits.len() == raw.len(),
        [b'1'..=b'9', rest @ ..] => rest.iter().all(u8::is_ascii_digit),
        _ => false,
    };
    if !canonical {
        return Err(corrupt());
    }
    raw.parse::<i64>().map_err(|_| corrupt())
}

/// Inverse of [`decode_balance`].
pub fn encode_balance(balance: i64) -> String {
    balance.to_string()
}
