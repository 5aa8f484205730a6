use axum::{Router, routing::post};

use super::handlers;
use crate::utils::types::AppState;

pub fn get_routes() -> Router<AppState> {
    Router::new().route("/billing/webhook", post(handlers::billing_webhook))
}
