use axum::extract::{Json, State};
use axum::http::HeaderMap;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{Customer, LinkCustomer, LinkResponse};
use crate::auth::token;
use crate::utils::ApiError;
use crate::utils::types::AppState;

/// Idempotent claim of a phone-anchored customer by an authenticated user.
/// A repeat claim by the same user succeeds; a claim of a row already owned
/// by someone else conflicts, as does claiming a second row at the same
/// merchant (partial unique index on (merchant_id, user_id)).
pub async fn link_customer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LinkCustomer>,
) -> Result<Json<LinkResponse>, ApiError> {
    use crate::schema::customers;

    let token = payload
        .token
        .clone()
        .or_else(|| token::bearer_token(&headers))
        .ok_or(ApiError::MissingFields)?;
    let user_id = token::verify_token(&token, &state.config.auth_jwt_secret)?;

    let mut conn = state.pool.get().await?;

    let customer = customers::table
        .find(payload.customer_id)
        .filter(customers::merchant_id.eq(&payload.merchant_id))
        .select(Customer::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or(ApiError::NotFound("customer"))?;

    match customer.user_id {
        Some(existing) if existing != user_id => {
            Err(ApiError::Conflict("customer already claimed by another user"))
        }
        Some(_) => Ok(Json(LinkResponse {
            success: true,
            customer,
        })),
        None => {
            let updated = diesel::update(customers::table.find(customer.id))
                .set(customers::user_id.eq(&user_id))
                .returning(Customer::as_returning())
                .get_result(&mut conn)
                .await?;

            Ok(Json(LinkResponse {
                success: true,
                customer: updated,
            }))
        }
    }
}
