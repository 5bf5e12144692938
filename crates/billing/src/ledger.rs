//! Optimistic-CAS debit protocol plus end-of-call reconciliation.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use voice_domain::billing::TransactionType;
use voice_domain::config::BillingConfig;
use voice_domain::error::{Error, Result};
use voice_domain::trace::TraceEvent;

pub struct BillingLedger {
    pool: PgPool,
    config: BillingConfig,
}

impl BillingLedger {
    pub fn new(pool: PgPool, config: BillingConfig) -> Self {
        Self { pool, config }
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    /// Precondition check at call admission.
    pub async fn has_credits(&self, org_id: Uuid, min_minutes: Decimal) -> Result<bool> {
        let row: Option<(Decimal,)> =
            sqlx::query_as("SELECT credit_balance FROM organizations WHERE id = $1")
                .bind(org_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row.map(|(balance,)| balance >= min_minutes).unwrap_or(false))
    }

    /// Attempt to debit `minutes` from `org_id`'s balance via optimistic
    /// CAS, retrying up to `config.max_cas_retries` times on version
    /// conflict. Returns `false` — never an error — on insufficient
    /// balance or CAS exhaustion; both are conservative "don't bill"
    /// outcomes, never a double-debit.
    pub async fn deduct(
        &self,
        org_id: Uuid,
        minutes: Decimal,
        conversation_id: Option<Uuid>,
    ) -> Result<bool> {
        for retry in 0..=self.config.max_cas_retries {
            let current: Option<(Decimal, i64)> =
                sqlx::query_as("SELECT credit_balance, version FROM organizations WHERE id = $1")
                    .bind(org_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| Error::Database(e.to_string()))?;

            let Some((balance, version)) = current else {
                return Ok(false);
            };
            if balance < minutes {
                TraceEvent::BillingDebit {
                    org_id: org_id.to_string(),
                    conversation_id: conversation_id.map(|id| id.to_string()),
                    amount: minutes.to_string(),
                    balance_after: None,
                    ok: false,
                    retries: retry,
                }
                .emit();
                return Ok(false);
            }

            let updated: Option<(Decimal,)> = sqlx::query_as(
                r#"
                UPDATE organizations
                SET credit_balance = credit_balance - $1,
                    version = version + 1,
                    updated_at = now()
                WHERE id = $2 AND version = $3 AND credit_balance >= $1
                RETURNING credit_balance
                "#,
            )
            .bind(minutes)
            .bind(org_id)
            .bind(version)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

            if let Some((balance_after,)) = updated {
                sqlx::query(
                    r#"
                    INSERT INTO transactions
                        (id, org_id, transaction_type, amount, description, balance_after, conversation_id, created_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(org_id)
                .bind(TransactionType::Debit)
                .bind(minutes)
                .bind("mid-call deduction")
                .bind(balance_after)
                .bind(conversation_id)
                .bind(Utc::now())
                .execute(&self.pool)
                .await
                .map_err(|e| Error::Database(e.to_string()))?;

                TraceEvent::BillingDebit {
                    org_id: org_id.to_string(),
                    conversation_id: conversation_id.map(|id| id.to_string()),
                    amount: minutes.to_string(),
                    balance_after: Some(balance_after.to_string()),
                    ok: true,
                    retries: retry,
                }
                .emit();
                return Ok(true);
            }
            // Version conflict: another debit won the race. Retry from step 1.
        }

        tracing::error!(
            org_id = %org_id,
            minutes = %minutes,
            retries = self.config.max_cas_retries,
            "billing CAS exhausted"
        );
        TraceEvent::BillingDebit {
            org_id: org_id.to_string(),
            conversation_id: conversation_id.map(|id| id.to_string()),
            amount: minutes.to_string(),
            balance_after: None,
            ok: false,
            retries: self.config.max_cas_retries,
        }
        .emit();
        Ok(false)
    }

    /// Increment-only credit. Always writes a ledger row; never fails on a
    /// version race (a plain atomic increment has none to lose).
    pub async fn credit(&self, org_id: Uuid, minutes: Decimal, description: &str) -> Result<()> {
        let updated: Option<(Decimal,)> = sqlx::query_as(
            r#"
            UPDATE organizations
            SET credit_balance = credit_balance + $1,
                version = version + 1,
                updated_at = now()
            WHERE id = $2
            RETURNING credit_balance
            "#,
        )
        .bind(minutes)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        let Some((balance_after,)) = updated else {
            TraceEvent::BillingCreditRefused {
                org_id: org_id.to_string(),
                requested: minutes.to_string(),
                reason: "organization not found".into(),
            }
            .emit();
            return Err(Error::Billing(format!("organization {org_id} not found")));
        };

        sqlx::query(
            r#"
            INSERT INTO transactions
                (id, org_id, transaction_type, amount, description, balance_after, conversation_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NULL, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(org_id)
        .bind(TransactionType::Credit)
        .bind(minutes)
        .bind(description)
        .bind(balance_after)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    /// End-of-call reconciliation: deduct whatever the mid-call ticker
    /// hasn't already covered. Failure is logged with enough context for
    /// manual review but is never propagated as fatal — the call is over
    /// either way.
    pub async fn reconcile_end_of_call(
        &self,
        org_id: Uuid,
        conversation_id: Uuid,
        duration_ms: u64,
        already_deducted: Decimal,
    ) {
        let total_minutes = Decimal::from(ceil_minutes(duration_ms));
        let remainder = total_minutes - already_deducted;
        if remainder <= Decimal::ZERO {
            return;
        }
        match self.deduct(org_id, remainder, Some(conversation_id)).await {
            Ok(true) => {}
            Ok(false) => tracing::error!(
                org_id = %org_id,
                conversation_id = %conversation_id,
                remainder = %remainder,
                "end-of-call reconciliation could not deduct remainder (insufficient balance or CAS exhaustion)"
            ),
            Err(e) => tracing::error!(
                org_id = %org_id,
                conversation_id = %conversation_id,
                remainder = %remainder,
                error = %e,
                "end-of-call reconciliation failed"
            ),
        }
    }
}

/// Ceiling of `duration_ms / 60000`, in whole minutes.
fn ceil_minutes(duration_ms: u64) -> u64 {
    (duration_ms + 59_999) / 60_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceil_minutes_rounds_up() {
        assert_eq!(ceil_minutes(0), 0);
        assert_eq!(ceil_minutes(1), 1);
        assert_eq!(ceil_minutes(60_000), 1);
        assert_eq!(ceil_minutes(60_001), 2);
        assert_eq!(ceil_minutes(125_000), 3);
    }
}
