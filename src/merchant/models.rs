use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::schema::merchants;

/// Free-tier merchants are capped at this many distinct customers.
pub const FREE_TIER_CUSTOMER_LIMIT: i64 = 25;

#[derive(Queryable, Selectable, Identifiable, Debug, Serialize)]
#[diesel(table_name = merchants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Merchant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_name: String,
    pub business_type: Option<String>,
    pub reward_text: String,
    pub stamps_needed: i32,
    pub plan_tier: String,
    pub subscription_status: String,
    pub billing_subscription_id: Option<String>,
    pub subscription_current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Merchant {
    /// Billing status is an eventually-consistent read; the webhook is the
    /// only writer.
    pub fn is_inactive(&self) -> bool {
        matches!(self.subscription_status.as_str(), "paused" | "canceled")
    }

    pub fn is_free_tier(&self) -> bool {
        self.plan_tier == "free"
    }
}

#[derive(Insertable)]
#[diesel(table_name = merchants)]
pub struct NewMerchant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_name: String,
    pub business_type: Option<String>,
    pub reward_text: String,
    pub stamps_needed: i32,
    pub plan_tier: String,
    pub subscription_status: String,
}

#[derive(Deserialize, Validate)]
pub struct OnboardMerchant {
    #[validate(length(min = 1, max = 120))]
    pub business_name: String,
    pub business_type: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub reward_text: String,
    #[validate(range(min = 5, max = 20))]
    pub stamps_needed: i32,
}

#[derive(Deserialize, Validate, AsChangeset)]
#[diesel(table_name = merchants)]
pub struct UpdateSettings {
    #[validate(length(min = 1, max = 120))]
    pub business_name: Option<String>,
    pub business_type: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub reward_text: Option<String>,
    #[validate(range(min = 5, max = 20))]
    pub stamps_needed: Option<i32>,
}

pub fn valid_business_type(business_type: &str) -> bool {
    matches!(business_type, "coffee" | "ice_cream" | "bagel" | "other")
}

/// Public payload behind the QR code's check-in page.
#[derive(Serialize)]
pub struct MerchantCard {
    pub id: Uuid,
    pub business_name: String,
    pub stamps_needed: i32,
    pub reward_text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_customers: i64,
    pub check_ins_this_month: i64,
    pub rewards_this_month: i64,
    pub free_tier_limit: i64,
    pub approaching_limit: bool,
    pub plan_tier: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCustomer {
    pub phone_last_4: String,
    pub visits_total: i32,
    pub stamps_current: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentCheckIn {
    pub timestamp: DateTime<Utc>,
    pub phone_last_4: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantStats {
    pub stats: StatsSummary,
    pub top_customers: Vec<TopCustomer>,
    pub recent_check_ins: Vec<RecentCheckIn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn onboard(stamps_needed: i32) -> OnboardMerchant {
        OnboardMerchant {
            business_name: "Joe's Coffee".into(),
            business_type: Some("coffee".into()),
            reward_text: "Free Coffee".into(),
            stamps_needed,
        }
    }

    #[test]
    fn stamps_needed_must_stay_in_range() {
        assert!(onboard(4).validate().is_err());
        assert!(onboard(5).validate().is_ok());
        assert!(onboard(20).validate().is_ok());
        assert!(onboard(21).validate().is_err());
    }

    #[test]
    fn settings_changeset_validates_only_present_fields() {
        let patch = UpdateSettings {
            business_name: None,
            business_type: None,
            reward_text: None,
            stamps_needed: Some(3),
        };
        assert!(patch.validate().is_err());

        let patch = UpdateSettings {
            business_name: Some("Bagel Bros".into()),
            business_type: None,
            reward_text: None,
            stamps_needed: None,
        };
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn business_type_allows_known_values_only() {
        for bt in ["coffee", "ice_cream", "bagel", "other"] {
            assert!(valid_business_type(bt));
        }
        assert!(!valid_business_type("laundromat"));
    }

    #[test]
    fn paused_and_canceled_merchants_are_inactive() {
        let mut merchant = Merchant {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            business_name: "Joe's Coffee".into(),
            business_type: None,
            reward_text: "Free Coffee".into(),
            stamps_needed: 10,
            plan_tier: "free".into(),
            subscription_status: "free".into(),
            billing_subscription_id: None,
            subscription_current_period_end: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!merchant.is_inactive());

        for status in ["trialing", "active"] {
            merchant.subscription_status = status.into();
            assert!(!merchant.is_inactive());
        }
        for status in ["paused", "canceled"] {
            merchant.subscription_status = status.into();
            assert!(merchant.is_inactive());
        }
    }
}
