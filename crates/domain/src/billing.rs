use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A billing root. One per tenant; every call against that tenant's agents
/// debits minutes from `credit_balance`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub credit_balance: Decimal,
    /// Bumped on every successful debit/credit; the optimistic-CAS guard.
    pub version: i64,
    pub current_plan: String,
    pub subscription_ref: Option<String>,
    pub billing_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Credit,
    Debit,
}

/// An append-only ledger row. Every debit or credit against an
/// [`Organization`] writes exactly one of these in the same transaction as
/// the balance update.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub org_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub description: String,
    pub balance_after: Decimal,
    pub conversation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
