use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use super::token;
use crate::utils::ApiError;
use crate::utils::types::AppState;

/// Authenticated merchant-dashboard caller, resolved from the
/// `Authorization: Bearer` header. Check-in and link requests carry their
/// token in the body instead and call `token::verify_token` directly.
pub struct AuthUser(pub Uuid);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token::bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
        let user_id = token::verify_token(&token, &state.config.auth_jwt_secret)?;
        Ok(AuthUser(user_id))
    }
}
