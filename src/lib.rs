use diesel::prelude::*;
use dotenvy::dotenv;
use std::env;

pub mod auth;
pub mod billing;
pub mod checkin;
pub mod customer;
pub mod merchant;
pub mod pool;
pub mod schema;
pub mod utils;

/// Blocking connection, used for running migrations at startup.
pub fn establish_connection() -> PgConnection {
    dotenv().ok();

    let db_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgConnection::establish(&db_url)
        .unwrap_or_else(|_| panic!("failed to connect to db url {}", db_url))
}
