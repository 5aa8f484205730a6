use axum::extract::FromRef;
use diesel_async::{AsyncPgConnection, pooled_connection::AsyncDieselConnectionManager};
use std::env;
use std::sync::Arc;

pub type Pool = bb8::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

#[derive(Clone)]
pub struct AppConfig {
    pub auth_jwt_secret: String,
    pub billing_webhook_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            auth_jwt_secret: env::var("AUTH_JWT_SECRET").expect("AUTH_JWT_SECRET must be set"),
            billing_webhook_secret: env::var("BILLING_WEBHOOK_SECRET")
                .expect("BILLING_WEBHOOK_SECRET must be set"),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub config: Arc<AppConfig>,
}

impl FromRef<AppState> for Pool {
    fn from_ref(state: &AppState) -> Pool {
        state.pool.clone()
    }
}
