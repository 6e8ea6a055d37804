use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Body of `POST /increase` and `POST /decrease`.
///
/// `amount` is taken as a raw JSON number so that fractional or out-of-range
/// values are reported as `invalid_amount` rather than a generic body error.
#[derive(Debug, Deserialize)]
pub struct BalanceChangeRequest {
    pub username: String,
    pub amount: Number,
}

impl BalanceChangeRequest {
    pub fn amount(&self) -> Result<i64> {
        self.amount
            .as_i64()
            .ok_or_else(|| LedgerError::InvalidAmount(self.amount.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CreateResponse {
    pub username: String,
    pub created: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct BalanceResponse {
    pub balance: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct BalanceChangeResponse {
    pub username: String,
    pub balance: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TotalResponse {
    pub total: i64,
    pub accounts: usize,
}
