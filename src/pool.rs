use diesel_async::{AsyncPgConnection, pooled_connection::AsyncDieselConnectionManager};
use std::env;

use crate::utils::types::Pool;

pub async fn get_pool() -> Result<Pool, String> {
    let db_url =
        env::var("DATABASE_URL").map_err(|e| format!("DATABASE_URL must be set: {}", e))?;

    let max_size = env::var("DATABASE_POOL_SIZE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);

    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(db_url);
    let pool = bb8::Pool::builder()
        .max_size(max_size)
        .build(config)
        .await
        .map_err(|e| format!("Failed to create db pool: {}", e))?;

    Ok(pool)
}
