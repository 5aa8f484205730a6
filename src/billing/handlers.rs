use axum::extract::{Json, State};
use axum::http::HeaderMap;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use hmac::{Hmac, Mac};
use serde_json::{Value, json};
use sha2::Sha256;

use super::models::{WebhookAction, WebhookEvent, plan_update};
use crate::utils::ApiError;
use crate::utils::types::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "webhook-signature";

/// Timestamps older than this are rejected to blunt replay.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verifies a `t=<unix>,v1=<hex hmac>` header over `"{t}.{body}"`.
pub(crate) fn verify_signature(
    secret: &str,
    header: &str,
    body: &str,
    now: i64,
) -> Result<(), ApiError> {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signature = hex::decode(value).ok(),
            _ => {}
        }
    }
    let (timestamp, signature) = match (timestamp, signature) {
        (Some(t), Some(s)) => (t, s),
        _ => return Err(ApiError::InvalidSignature),
    };

    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(ApiError::InvalidSignature);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| ApiError::InvalidSignature)?;
    mac.update(format!("{}.{}", timestamp, body).as_bytes());
    // constant-time comparison
    mac.verify_slice(&signature)
        .map_err(|_| ApiError::InvalidSignature)
}

/// The processor pushes billing state here; the eligibility gate only ever
/// reads the columns this writes. No synchronous calls back out.
pub async fn billing_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, ApiError> {
    use crate::schema::merchants;

    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::InvalidSignature)?;
    verify_signature(
        &state.config.billing_webhook_secret,
        header,
        &body,
        Utc::now().timestamp(),
    )?;

    let event: WebhookEvent = serde_json::from_str(&body)
        .map_err(|_| ApiError::Validation("malformed webhook payload".to_owned()))?;

    let Some(action) = plan_update(&event) else {
        tracing::debug!(event_type = %event.event_type, "ignoring unhandled billing event");
        return Ok(Json(json!({ "received": true })));
    };

    let mut conn = state.pool.get().await?;
    let now = Utc::now();

    match action {
        WebhookAction::Activate {
            merchant_id,
            subscription_id,
        } => {
            diesel::update(merchants::table.find(&merchant_id))
                .set((
                    merchants::billing_subscription_id.eq(&subscription_id),
                    merchants::subscription_status.eq("active"),
                    merchants::plan_tier.eq("paid"),
                    merchants::updated_at.eq(&now),
                ))
                .execute(&mut conn)
                .await?;
        }
        WebhookAction::SyncStatus {
            merchant_id,
            status,
            current_period_end,
        } => {
            diesel::update(merchants::table.find(&merchant_id))
                .set((
                    merchants::subscription_status.eq(&status),
                    merchants::subscription_current_period_end.eq(&current_period_end),
                    merchants::updated_at.eq(&now),
                ))
                .execute(&mut conn)
                .await?;
        }
        WebhookAction::Cancel { merchant_id } => {
            diesel::update(merchants::table.find(&merchant_id))
                .set((
                    merchants::subscription_status.eq("canceled"),
                    merchants::plan_tier.eq("free"),
                    merchants::updated_at.eq(&now),
                ))
                .execute(&mut conn)
                .await?;
        }
        WebhookAction::Pause { subscription_id } => {
            diesel::update(
                merchants::table.filter(merchants::billing_subscription_id.eq(&subscription_id)),
            )
            .set((
                merchants::subscription_status.eq("paused"),
                merchants::updated_at.eq(&now),
            ))
            .execute(&mut conn)
            .await?;
        }
    }

    Ok(Json(json!({ "received": true })))
}
