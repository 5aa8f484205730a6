use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

/// Every failure the API can surface, one variant per machine-readable kind.
///
/// Policy variants carry the structured data the caller needs to render a
/// useful message; storage failures collapse to `Internal` after being
/// logged at the conversion site.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing required fields")]
    MissingFields,
    #[error("{0}")]
    Validation(String),
    #[error("merchant not found")]
    MerchantNotFound,
    #[error("this loyalty program is temporarily unavailable")]
    MerchantInactive,
    #[error("this business has reached the free tier limit")]
    CustomerLimitReached,
    #[error("authenticated user has no linked phone; provide a phone number to anchor the record")]
    LinkingRequired,
    #[error("already checked in within the last 24 hours")]
    AlreadyCheckedIn {
        stamps_current: i32,
        stamps_needed: i32,
        next_eligible_at: DateTime<Utc>,
    },
    #[error("invalid auth token")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::MissingFields => "missing_fields",
            ApiError::Validation(_) => "validation_error",
            ApiError::MerchantNotFound => "merchant_not_found",
            ApiError::MerchantInactive => "merchant_inactive",
            ApiError::CustomerLimitReached => "customer_limit_reached",
            ApiError::LinkingRequired => "linking_required",
            ApiError::AlreadyCheckedIn { .. } => "already_checked_in",
            ApiError::Unauthorized => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::InvalidSignature => "invalid_signature",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFields
            | ApiError::Validation(_)
            | ApiError::LinkingRequired
            | ApiError::InvalidSignature => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::MerchantInactive | ApiError::CustomerLimitReached => StatusCode::FORBIDDEN,
            ApiError::MerchantNotFound | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::AlreadyCheckedIn { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });

        match &self {
            ApiError::CustomerLimitReached => {
                body["upgradeRequired"] = json!(true);
            }
            ApiError::AlreadyCheckedIn {
                stamps_current,
                stamps_needed,
                next_eligible_at,
            } => {
                body["stamps_current"] = json!(stamps_current);
                body["stamps_needed"] = json!(stamps_needed);
                body["nextEligibleAt"] = json!(next_eligible_at);
            }
            _ => {}
        }

        (self.status(), Json(body)).into_response()
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => ApiError::Conflict("resource already exists"),
            err => {
                tracing::error!(error = %err, "database error");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl<E: std::fmt::Display + std::error::Error + 'static> From<bb8::RunError<E>> for ApiError {
    fn from(err: bb8::RunError<E>) -> Self {
        tracing::error!(error = %err, "connection pool error");
        ApiError::Internal(err.to_string())
    }
}

pub async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
