use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use super::models::{NewCheckIn, NewRewardRedemption};
use crate::customer::models::{Customer, NewCustomer};
use crate::merchant::models::{FREE_TIER_CUSTOMER_LIMIT, Merchant};
use crate::utils::ApiError;
use crate::utils::phone;

/// Extra stamps granted on a customer's first-ever visit, on top of the
/// regular one per check-in.
pub const FIRST_VISIT_BONUS: i32 = 2;

const DUPLICATE_WINDOW_HOURS: i64 = 24;

/// A check-in becomes eligible again exactly 24h after the previous one,
/// not before.
pub fn next_eligible_at(last_check_in: DateTime<Utc>) -> DateTime<Utc> {
    last_check_in + Duration::hours(DUPLICATE_WINDOW_HOURS)
}

/// Result of the pure stamp-ledger step for one check-in.
#[derive(Debug, PartialEq, Eq)]
pub struct StampOutcome {
    pub stamps_added: i32,
    pub stamps_current: i32,
    pub redeemed: bool,
    pub is_first_signup: bool,
}

impl StampOutcome {
    pub fn apply(stamps_current: i32, stamps_lifetime: i32, stamps_needed: i32) -> Self {
        let is_first_signup = stamps_lifetime == 0;
        let stamps_added = 1 + if is_first_signup { FIRST_VISIT_BONUS } else { 0 };
        let total = stamps_current + stamps_added;
        let redeemed = total >= stamps_needed;

        // on redemption the counter resets to zero; any surplus above the
        // threshold (a bonus-driven overshoot) is discarded, not carried over
        StampOutcome {
            stamps_added,
            stamps_current: if redeemed { 0 } else { total },
            redeemed,
            is_first_signup,
        }
    }
}

/// What a successful check-in hands back to the transport layer.
#[derive(Debug)]
pub struct CheckInOutcome {
    pub customer_id: Uuid,
    pub stamps_current: i32,
    pub stamps_needed: i32,
    pub redeemed: bool,
    pub reward_text: String,
    pub business_name: String,
    pub is_first_signup: bool,
}

/// The check-in transaction: resolve the customer, gate on merchant status
/// and free-tier capacity, suppress duplicate visits, grant stamps and
/// record the redemption when the card fills up.
///
/// Everything runs on one connection inside one transaction, so a policy
/// rejection or storage failure leaves no partial writes behind and a failed
/// call is safe to retry.
pub async fn run_check_in(
    conn: &mut AsyncPgConnection,
    merchant_id: Uuid,
    phone: Option<&str>,
    user_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<CheckInOutcome, ApiError> {
    use crate::schema::{check_ins, customers, merchants, rewards_redeemed};

    let phone = phone.map(str::to_owned);

    conn.transaction::<CheckInOutcome, ApiError, _>(move |conn| {
        Box::pin(async move {
            let merchant = merchants::table
                .find(merchant_id)
                .select(Merchant::as_select())
                .first(conn)
                .await
                .optional()?
                .ok_or(ApiError::MerchantNotFound)?;

            if merchant.is_inactive() {
                return Err(ApiError::MerchantInactive);
            }

            let digits = phone
                .as_deref()
                .map(phone::digits_only)
                .filter(|d| !d.is_empty());
            let phone_hash = digits.as_deref().map(|d| phone::hash_phone(merchant.id, d));

            // identity resolution: authenticated user id wins, phone hash
            // is the fallback. The row is locked for the rest of the
            // transaction so concurrent check-ins on the same customer
            // serialize: the second one re-reads committed state and its
            // duplicate check fires instead of clobbering the counters.
            let mut customer: Option<Customer> = None;
            if let Some(uid) = user_id {
                customer = customers::table
                    .filter(customers::merchant_id.eq(&merchant.id))
                    .filter(customers::user_id.eq(&uid))
                    .select(Customer::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?;
            }
            if customer.is_none() {
                if let Some(hash) = &phone_hash {
                    customer = customers::table
                        .filter(customers::merchant_id.eq(&merchant.id))
                        .filter(customers::phone_hash.eq(hash))
                        .select(Customer::as_select())
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;
                }
            }

            let customer = match customer {
                Some(customer) => customer,
                None => {
                    // capacity gates new signups only; existing customers
                    // are never blocked by the limit
                    if merchant.is_free_tier() {
                        let count: i64 = customers::table
                            .filter(customers::merchant_id.eq(&merchant.id))
                            .count()
                            .get_result(conn)
                            .await?;
                        if count >= FREE_TIER_CUSTOMER_LIMIT {
                            return Err(ApiError::CustomerLimitReached);
                        }
                    }

                    // a new row must be phone-anchored; an authenticated user
                    // without a phone has nothing to hang the record on
                    let (Some(hash), Some(digits)) = (phone_hash.clone(), digits.as_deref())
                    else {
                        return Err(ApiError::LinkingRequired);
                    };

                    let record = NewCustomer {
                        id: Uuid::new_v4(),
                        merchant_id: merchant.id,
                        phone_hash: hash,
                        phone_last_4: phone::last_4(digits),
                        user_id,
                        stamps_current: 0,
                        stamps_lifetime: 0,
                        visits_total: 0,
                        first_visit_at: now,
                    };

                    diesel::insert_into(customers::table)
                        .values(&record)
                        .returning(Customer::as_returning())
                        .get_result(conn)
                        .await?
                }
            };

            let window_start = now - Duration::hours(DUPLICATE_WINDOW_HOURS);
            let last_visit: Option<DateTime<Utc>> = check_ins::table
                .filter(check_ins::merchant_id.eq(&merchant.id))
                .filter(check_ins::customer_id.eq(&customer.id))
                .filter(check_ins::created_at.gt(window_start))
                .order(check_ins::created_at.desc())
                .select(check_ins::created_at)
                .first(conn)
                .await
                .optional()?;

            if let Some(last) = last_visit {
                return Err(ApiError::AlreadyCheckedIn {
                    stamps_current: customer.stamps_current,
                    stamps_needed: merchant.stamps_needed,
                    next_eligible_at: next_eligible_at(last),
                });
            }

            let outcome = StampOutcome::apply(
                customer.stamps_current,
                customer.stamps_lifetime,
                merchant.stamps_needed,
            );

            diesel::insert_into(check_ins::table)
                .values(&NewCheckIn {
                    id: Uuid::new_v4(),
                    merchant_id: merchant.id,
                    customer_id: customer.id,
                    stamps_added: outcome.stamps_added,
                    created_at: now,
                })
                .execute(conn)
                .await?;

            diesel::update(customers::table.find(&customer.id))
                .set((
                    customers::stamps_current.eq(&outcome.stamps_current),
                    customers::stamps_lifetime.eq(customer.stamps_lifetime + outcome.stamps_added),
                    customers::visits_total.eq(customer.visits_total + 1),
                    customers::last_visit_at.eq(&now),
                ))
                .execute(conn)
                .await?;

            if outcome.redeemed {
                diesel::insert_into(rewards_redeemed::table)
                    .values(&NewRewardRedemption {
                        id: Uuid::new_v4(),
                        merchant_id: merchant.id,
                        customer_id: customer.id,
                        stamps_used: merchant.stamps_needed,
                        redeemed_at: now,
                    })
                    .execute(conn)
                    .await?;
            }

            Ok(CheckInOutcome {
                customer_id: customer.id,
                stamps_current: outcome.stamps_current,
                stamps_needed: merchant.stamps_needed,
                redeemed: outcome.redeemed,
                reward_text: merchant.reward_text,
                business_name: merchant.business_name,
                is_first_signup: outcome.is_first_signup,
            })
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn first_visit_grants_one_plus_bonus() {
        let outcome = StampOutcome::apply(0, 0, 10);
        assert_eq!(
            outcome,
            StampOutcome {
                stamps_added: 3,
                stamps_current: 3,
                redeemed: false,
                is_first_signup: true,
            }
        );
    }

    #[test]
    fn repeat_visit_grants_exactly_one() {
        let outcome = StampOutcome::apply(3, 3, 10);
        assert_eq!(outcome.stamps_added, 1);
        assert_eq!(outcome.stamps_current, 4);
        assert!(!outcome.redeemed);
        assert!(!outcome.is_first_signup);
    }

    #[test]
    fn reaching_the_threshold_redeems_and_resets() {
        let outcome = StampOutcome::apply(9, 20, 10);
        assert_eq!(outcome.stamps_added, 1);
        assert_eq!(outcome.stamps_current, 0);
        assert!(outcome.redeemed);
    }

    #[test]
    fn bonus_overshoot_is_discarded_on_reset() {
        // 4 + 3 = 7 against a threshold of 5: the surplus 2 do not carry over
        let outcome = StampOutcome::apply(4, 0, 5);
        assert_eq!(outcome.stamps_added, 3);
        assert!(outcome.redeemed);
        assert_eq!(outcome.stamps_current, 0);
    }

    #[test]
    fn counter_never_rests_at_or_above_threshold() {
        for needed in 5..=20 {
            for current in 0..needed {
                for lifetime in [0, 1, 50] {
                    let outcome = StampOutcome::apply(current, lifetime, needed);
                    assert!(outcome.stamps_current >= 0);
                    assert!(outcome.stamps_current < needed);
                }
            }
        }
    }

    #[test]
    fn next_eligible_is_exactly_24h_after_last_visit() {
        let last = Utc.with_ymd_and_hms(2026, 8, 20, 9, 30, 0).unwrap();
        assert_eq!(
            next_eligible_at(last),
            Utc.with_ymd_and_hms(2026, 8, 21, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn visit_at_exactly_24h_is_outside_the_window() {
        // the guard filters on created_at > now - 24h, so a visit exactly
        // 24h old no longer blocks
        let now = Utc.with_ymd_and_hms(2026, 8, 21, 9, 30, 0).unwrap();
        let last = Utc.with_ymd_and_hms(2026, 8, 20, 9, 30, 0).unwrap();
        let window_start = now - Duration::hours(DUPLICATE_WINDOW_HOURS);
        assert!(!(last > window_start));
        assert!(last + Duration::seconds(1) > window_start);
    }
}
