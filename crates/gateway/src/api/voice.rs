//! Telephony voice webhooks: `/voice/incoming` (admission) and
//! `/voice/status` (provider-side call lifecycle).

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Form;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use uuid::Uuid;

use voice_domain::call::{Agent, Conversation, ConversationStatus};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IncomingCallForm {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
}

/// Admission: look up the agent answering `to`, check the org has credit,
/// open a `Conversation` row, and point the provider at `/media-stream`
/// with the identifiers it needs to carry as stream parameters.
pub async fn incoming(
    State(state): State<AppState>,
    Form(form): Form<IncomingCallForm>,
) -> Response {
    let agent: Option<Agent> = match sqlx::query_as(
        "SELECT * FROM agents WHERE phone_number = $1 AND is_active = true",
    )
    .bind(&form.to)
    .fetch_optional(&state.pool)
    .await
    {
        Ok(agent) => agent,
        Err(e) => {
            tracing::error!(error = %e, "failed to look up agent by phone number");
            return hangup_xml("We're sorry, an unexpected error occurred.");
        }
    };

    let Some(agent) = agent else {
        tracing::warn!(to = %form.to, "no active agent for incoming call");
        return hangup_xml("This number is not currently in service.");
    };

    if !agent.billing_disabled {
        let min_minutes = Decimal::from_str(&state.config.billing.ticker_deduct_minutes)
            .unwrap_or(Decimal::ONE);
        match state.billing.has_credits(agent.org_id, min_minutes).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(org_id = %agent.org_id, "insufficient balance at admission");
                return hangup_xml("We're sorry, this service is temporarily unavailable.");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to check org balance");
                return hangup_xml("We're sorry, an unexpected error occurred.");
            }
        }
    }

    let conversation: Result<Conversation, sqlx::Error> = sqlx::query_as(
        r#"
        INSERT INTO conversations (id, agent_id, org_id, provider_call_id, status, start_time, cost_accrued)
        VALUES ($1, $2, $3, $4, $5, now(), 0)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(agent.id)
    .bind(agent.org_id)
    .bind(&form.call_sid)
    .bind(ConversationStatus::Active)
    .fetch_one(&state.pool)
    .await;

    let conversation = match conversation {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to open conversation");
            return hangup_xml("We're sorry, an unexpected error occurred.");
        }
    };

    let Some(base_url) = state.config.telephony.media_stream_base_url.as_deref() else {
        tracing::error!("telephony.media_stream_base_url not configured");
        return hangup_xml("We're sorry, this service is temporarily unavailable.");
    };

    let stream_url = format!("{base_url}/media-stream");
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
  <Connect>
    <Stream url="{stream_url}">
      <Parameter name="agentId" value="{agent_id}" />
      <Parameter name="conversationId" value="{conversation_id}" />
      <Parameter name="orgId" value="{org_id}" />
    </Stream>
  </Connect>
</Response>"#,
        agent_id = agent.id,
        conversation_id = conversation.id,
        org_id = agent.org_id,
    );

    xml_response(StatusCode::OK, xml)
}

#[derive(Debug, Deserialize)]
pub struct StatusCallbackForm {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "CallStatus")]
    pub call_status: String,
}

/// Map the provider's call-status vocabulary onto `ConversationStatus` and
/// persist it — handles calls that end before a `stop` frame ever reaches
/// `/media-stream` (e.g. the callee hangs up before the stream connects).
pub async fn status(State(state): State<AppState>, Form(form): Form<StatusCallbackForm>) -> Response {
    let status = match form.call_status.as_str() {
        "completed" => ConversationStatus::Completed,
        "failed" | "busy" | "no-answer" | "canceled" => ConversationStatus::Failed,
        _ => ConversationStatus::Active,
    };

    if let Err(e) = sqlx::query(
        "UPDATE conversations SET status = $1, end_time = CASE WHEN $1 != 'ACTIVE' THEN now() ELSE end_time END WHERE provider_call_id = $2",
    )
    .bind(status)
    .bind(&form.call_sid)
    .execute(&state.pool)
    .await
    {
        tracing::warn!(call_sid = %form.call_sid, error = %e, "failed to update conversation status");
    }

    StatusCode::NO_CONTENT.into_response()
}

fn hangup_xml(message: &str) -> Response {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
  <Say>{message}</Say>
  <Hangup />
</Response>"#
    );
    xml_response(StatusCode::OK, xml)
}

fn xml_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/xml")], body).into_response()
}
