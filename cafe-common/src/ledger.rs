//! Cash register ledger totals

use crate::pricing::round2;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Direction of a cash movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(Error::Internal(format!("Unknown transaction type: {}", other))),
        }
    }
}

/// Whether the register is up or down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Standing {
    Surplus,
    Deficit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_balance: f64,
    pub standing: Standing,
}

/// Sum income and expenses; a zero balance counts as surplus
pub fn summarize<I>(movements: I) -> LedgerSummary
where
    I: IntoIterator<Item = (TransactionKind, f64)>,
{
    let (income, expenses) =
        movements
            .into_iter()
            .fold((0.0, 0.0), |(inc, exp), (kind, amount)| match kind {
                TransactionKind::Income => (inc + amount, exp),
                TransactionKind::Expense => (inc, exp + amount),
            });

    let net = round2(income - expenses);
    LedgerSummary {
        total_income: round2(income),
        total_expenses: round2(expenses),
        net_balance: net,
        standing: if net >= 0.0 {
            Standing::Surplus
        } else {
            Standing::Deficit
        },
    }
}
