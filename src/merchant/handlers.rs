use axum::extract::{Json, Path, Query, State};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use super::models::{
    FREE_TIER_CUSTOMER_LIMIT, Merchant, MerchantCard, MerchantStats, NewMerchant, OnboardMerchant,
    RecentCheckIn, StatsSummary, TopCustomer, UpdateSettings, valid_business_type,
};
use crate::auth::models::AuthUser;
use crate::utils::ApiError;
use crate::utils::slug::unique_slug;
use crate::utils::types::Pool;

pub async fn create_merchant(
    State(pool): State<Pool>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<OnboardMerchant>,
) -> Result<Json<Merchant>, ApiError> {
    use crate::schema::merchants;

    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    if let Some(business_type) = &payload.business_type {
        if !valid_business_type(business_type) {
            return Err(ApiError::Validation("unknown business_type".to_owned()));
        }
    }

    let mut conn = pool.get().await?;

    let record = NewMerchant {
        id: Uuid::new_v4(),
        user_id,
        business_name: payload.business_name,
        business_type: payload.business_type,
        reward_text: payload.reward_text,
        stamps_needed: payload.stamps_needed,
        plan_tier: "free".to_owned(),
        subscription_status: "free".to_owned(),
    };

    // unique user_id index turns a second onboarding into a conflict
    let res = diesel::insert_into(merchants::table)
        .values(&record)
        .returning(Merchant::as_returning())
        .get_result(&mut conn)
        .await?;

    Ok(Json(res))
}

pub async fn update_settings(
    State(pool): State<Pool>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateSettings>,
) -> Result<Json<Merchant>, ApiError> {
    use crate::schema::merchants;

    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    if let Some(business_type) = &payload.business_type {
        if !valid_business_type(business_type) {
            return Err(ApiError::Validation("unknown business_type".to_owned()));
        }
    }

    let mut conn = pool.get().await?;

    let res = diesel::update(merchants::table.filter(merchants::user_id.eq(&user_id)))
        .set((&payload, merchants::updated_at.eq(Utc::now())))
        .returning(Merchant::as_returning())
        .get_result(&mut conn)
        .await
        .optional()?
        .ok_or(ApiError::NotFound("merchant"))?;

    Ok(Json(res))
}

#[derive(Deserialize)]
pub struct LookupParams {
    pub slug: Option<String>,
}

pub async fn lookup_merchant(
    State(pool): State<Pool>,
    Query(params): Query<LookupParams>,
) -> Result<Json<Value>, ApiError> {
    use crate::schema::merchants;

    let slug = params
        .slug
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::MissingFields)?;

    let mut conn = pool.get().await?;

    // slugs are derived, not stored; merchant counts stay small enough to scan
    let rows: Vec<(Uuid, String)> = merchants::table
        .select((merchants::id, merchants::business_name))
        .load(&mut conn)
        .await?;

    let (id, business_name) = rows
        .into_iter()
        .find(|(id, name)| unique_slug(name, *id) == slug)
        .ok_or(ApiError::MerchantNotFound)?;

    Ok(Json(json!({ "id": id, "business_name": business_name })))
}

pub async fn merchant_card(
    State(pool): State<Pool>,
    Path(id): Path<Uuid>,
) -> Result<Json<MerchantCard>, ApiError> {
    use crate::schema::merchants;

    let mut conn = pool.get().await?;

    let merchant = merchants::table
        .find(id)
        .select(Merchant::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or(ApiError::MerchantNotFound)?;

    Ok(Json(MerchantCard {
        id: merchant.id,
        business_name: merchant.business_name,
        stamps_needed: merchant.stamps_needed,
        reward_text: merchant.reward_text,
    }))
}

pub async fn merchant_stats(
    State(pool): State<Pool>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MerchantStats>, ApiError> {
    use crate::schema::{check_ins, customers, merchants, rewards_redeemed};

    let mut conn = pool.get().await?;

    let merchant = merchants::table
        .filter(merchants::user_id.eq(&user_id))
        .select(Merchant::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or(ApiError::MerchantNotFound)?;

    let total_customers: i64 = customers::table
        .filter(customers::merchant_id.eq(&merchant.id))
        .count()
        .get_result(&mut conn)
        .await?;

    let since = month_start(Utc::now());

    let check_ins_this_month: i64 = check_ins::table
        .filter(check_ins::merchant_id.eq(&merchant.id))
        .filter(check_ins::created_at.ge(since))
        .count()
        .get_result(&mut conn)
        .await?;

    let rewards_this_month: i64 = rewards_redeemed::table
        .filter(rewards_redeemed::merchant_id.eq(&merchant.id))
        .filter(rewards_redeemed::redeemed_at.ge(since))
        .count()
        .get_result(&mut conn)
        .await?;

    let top_customers: Vec<TopCustomer> = customers::table
        .filter(customers::merchant_id.eq(&merchant.id))
        .order(customers::visits_total.desc())
        .limit(5)
        .select((
            customers::phone_last_4,
            customers::visits_total,
            customers::stamps_current,
        ))
        .load::<(String, i32, i32)>(&mut conn)
        .await?
        .into_iter()
        .map(
            |(phone_last_4, visits_total, stamps_current)| TopCustomer {
                phone_last_4,
                visits_total,
                stamps_current,
            },
        )
        .collect();

    let recent_check_ins: Vec<RecentCheckIn> = check_ins::table
        .inner_join(customers::table)
        .filter(check_ins::merchant_id.eq(&merchant.id))
        .order(check_ins::created_at.desc())
        .limit(10)
        .select((check_ins::created_at, customers::phone_last_4))
        .load::<(DateTime<Utc>, String)>(&mut conn)
        .await?
        .into_iter()
        .map(|(timestamp, phone_last_4)| RecentCheckIn {
            timestamp,
            phone_last_4,
        })
        .collect();

    let approaching_limit = merchant.is_free_tier() && total_customers >= 20;

    Ok(Json(MerchantStats {
        stats: StatsSummary {
            total_customers,
            check_ins_this_month,
            rewards_this_month,
            free_tier_limit: FREE_TIER_CUSTOMER_LIMIT,
            approaching_limit,
            plan_tier: merchant.plan_tier,
        },
        top_customers,
        recent_check_ins,
    }))
}

pub async fn delete_account(
    State(pool): State<Pool>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, ApiError> {
    use crate::schema::merchants;

    let mut conn = pool.get().await?;

    // customers, check-ins and redemptions follow via ON DELETE CASCADE
    let deleted = diesel::delete(merchants::table.filter(merchants::user_id.eq(&user_id)))
        .execute(&mut conn)
        .await?;

    if deleted == 0 {
        return Err(ApiError::NotFound("merchant"));
    }

    Ok(Json(json!({ "success": true })))
}

fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}
