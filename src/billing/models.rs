use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

/// Processor webhook envelope: `{"type": "...", "data": {"object": {...}}}`.
/// The object shape varies per event, so it stays a raw value and the
/// interesting fields are picked out below.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: Value,
}

/// The merchant-row update a webhook event translates to. Billing state is
/// written here and only ever read by the eligibility gate.
#[derive(Debug, PartialEq)]
pub enum WebhookAction {
    /// checkout.session.completed: the merchant paid, store the subscription.
    Activate {
        merchant_id: Uuid,
        subscription_id: String,
    },
    /// customer.subscription.updated: mirror the processor's status.
    SyncStatus {
        merchant_id: Uuid,
        status: String,
        current_period_end: Option<DateTime<Utc>>,
    },
    /// customer.subscription.deleted: back to the free tier.
    Cancel { merchant_id: Uuid },
    /// invoice.payment_failed: merchant known only by subscription id.
    Pause { subscription_id: String },
}

pub fn plan_update(event: &WebhookEvent) -> Option<WebhookAction> {
    let object = &event.data.object;

    match event.event_type.as_str() {
        "checkout.session.completed" => Some(WebhookAction::Activate {
            merchant_id: metadata_merchant_id(object)?,
            subscription_id: object.get("subscription")?.as_str()?.to_owned(),
        }),
        "customer.subscription.updated" => Some(WebhookAction::SyncStatus {
            merchant_id: metadata_merchant_id(object)?,
            status: object
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("active")
                .to_owned(),
            current_period_end: object
                .get("current_period_end")
                .and_then(Value::as_i64)
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        }),
        "customer.subscription.deleted" => Some(WebhookAction::Cancel {
            merchant_id: metadata_merchant_id(object)?,
        }),
        "invoice.payment_failed" => Some(WebhookAction::Pause {
            subscription_id: object.get("subscription")?.as_str()?.to_owned(),
        }),
        _ => None,
    }
}

fn metadata_merchant_id(object: &Value) -> Option<Uuid> {
    object
        .get("metadata")?
        .get("merchant_id")?
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
}
