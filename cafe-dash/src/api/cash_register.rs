//! Cash register endpoints

use axum::{extract::State, http::StatusCode};
use cafe_common::db::{Transaction, EXPENSE_CATEGORIES};
use cafe_common::ledger::{summarize, LedgerSummary, TransactionKind};
use serde::Serialize;
use uuid::Uuid;

use super::extract::{Json, Path};
use crate::db::transactions::{self, ExpenseInput};
use crate::error::ApiResult;
use crate::AppState;

/// Ledger split into columns plus its totals
#[derive(Debug, Serialize)]
pub struct CashRegister {
    pub income: Vec<Transaction>,
    pub expenses: Vec<Transaction>,
    #[serde(flatten)]
    pub summary: LedgerSummary,
    pub expense_categories: &'static [&'static str],
}

/// GET /api/cash-register
pub async fn get_cash_register(State(state): State<AppState>) -> ApiResult<Json<CashRegister>> {
    let all = transactions::list_transactions(&state.db).await?;
    let summary = summarize(all.iter().map(|t| (t.kind, t.amount)));
    let (income, expenses): (Vec<_>, Vec<_>) = all
        .into_iter()
        .partition(|t| t.kind == TransactionKind::Income);

    Ok(Json(CashRegister {
        income,
        expenses,
        summary,
        expense_categories: &EXPENSE_CATEGORIES,
    }))
}

/// POST /api/cash-register/expenses
pub async fn add_expense(
    State(state): State<AppState>,
    Json(req): Json<ExpenseInput>,
) -> ApiResult<(StatusCode, Json<Transaction>)> {
    let created = transactions::add_expense(&state.db, &req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /api/cash-register/:id
pub async fn delete_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    transactions::delete_transaction(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
