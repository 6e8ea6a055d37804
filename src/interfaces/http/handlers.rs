use super::AppState;
use super::dto::{
    BalanceChangeRequest, BalanceChangeResponse, BalanceResponse, CreateResponse, TotalResponse,
};
use super::errors::{json_error, rejection_response};
use crate::domain::account::Username;
use crate::error::LedgerError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub async fn index() -> &'static str {
    "kvledger balance service"
}

pub async fn health(State(state): State<AppState>) -> Response {
    match state.ledger.health().await {
        Ok(()) => Json(json!({ "status": "ok" })).into_response(),
        Err(e) => json_error(StatusCode::SERVICE_UNAVAILABLE, e.code(), e.to_string()),
    }
}

pub async fn create_account(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<CreateResponse>, LedgerError> {
    let username = Username::new(username)?;
    let outcome = state.ledger.create_account(&username).await?;
    Ok(Json(CreateResponse {
        username: username.to_string(),
        created: outcome.created(),
    }))
}

pub async fn get_balance(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<BalanceResponse>, LedgerError> {
    let username = Username::new(username)?;
    let balance = state.ledger.get_balance(&username).await?;
    Ok(Json(BalanceResponse { balance }))
}

pub async fn increase(
    State(state): State<AppState>,
    body: Result<Json<BalanceChangeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    change_balance(&state, request, Direction::Increase)
        .await
        .into_response()
}

pub async fn decrease(
    State(state): State<AppState>,
    body: Result<Json<BalanceChangeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    change_balance(&state, request, Direction::Decrease)
        .await
        .into_response()
}

pub async fn total(State(state): State<AppState>) -> Result<Json<TotalResponse>, LedgerError> {
    let (total, accounts) = state.ledger.total().await?;
    Ok(Json(TotalResponse { total, accounts }))
}

enum Direction {
    Increase,
    Decrease,
}

async fn change_balance(
    state: &AppState,
    request: BalanceChangeRequest,
    direction: Direction,
) -> Result<Json<BalanceChangeResponse>, LedgerError> {
    let amount = request.amount()?;
    let username = Username::new(request.username)?;
    let balance = match direction {
        Direction::Increase => state.ledger.increment(&username, amount).await?,
        Direction::Decrease => state.ledger.decrement(&username, amount).await?,
    };
    Ok(Json(BalanceChangeResponse {
        username: username.to_string(),
        balance,
    }))
}
