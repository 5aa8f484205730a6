use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use super::handlers;
use crate::utils::types::AppState;

pub fn get_routes() -> Router<AppState> {
    Router::new()
        .route("/merchants", post(handlers::create_merchant))
        .route("/merchants/{id}/card", get(handlers::merchant_card))
        .route("/merchant/lookup", get(handlers::lookup_merchant))
        .route("/merchant/settings", patch(handlers::update_settings))
        .route("/merchant/stats", get(handlers::merchant_stats))
        .route("/account", delete(handlers::delete_account))
}
