use axum::{Router, routing::post};

use super::handlers;
use crate::utils::types::AppState;

pub fn get_routes() -> Router<AppState> {
    Router::new().route("/customers/link", post(handlers::link_customer))
}
