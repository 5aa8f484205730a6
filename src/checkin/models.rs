use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{check_ins, rewards_redeemed};

/// Append-only stamp grant; also the source of truth for the rolling
/// 24-hour duplicate-visit window.
#[derive(Insertable)]
#[diesel(table_name = check_ins)]
pub struct NewCheckIn {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub customer_id: Uuid,
    pub stamps_added: i32,
    pub created_at: DateTime<Utc>,
}

/// Audit record written when a card fills up. Never read back by the
/// check-in flow itself.
#[derive(Insertable)]
#[diesel(table_name = rewards_redeemed)]
pub struct NewRewardRedemption {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub customer_id: Uuid,
    pub stamps_used: i32,
    pub redeemed_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct CheckInRequest {
    #[serde(rename = "merchantId")]
    pub merchant_id: Option<String>,
    pub phone: Option<String>,
    pub token: Option<String>,
}

#[derive(Serialize)]
pub struct CheckInResponse {
    pub success: bool,
    pub stamps_current: i32,
    pub stamps_needed: i32,
    pub redeemed: bool,
    pub reward_text: String,
    pub business_name: String,
    pub token: String,
    pub customer_id: Uuid,
    #[serde(rename = "isFirstSignup")]
    pub is_first_signup: bool,
}
