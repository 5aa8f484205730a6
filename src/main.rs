use axum::Router;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use listenfd::ListenFd;
use std::env;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use punchcard::utils::types::{AppConfig, AppState};
use punchcard::{billing, checkin, customer, merchant, pool, utils};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/");

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let pool = pool::get_pool().await.expect("failed to create db pool");

    // MigrationHarness is sync, so migrations run on a blocking connection
    tokio::task::spawn_blocking(|| {
        let mut conn = punchcard::establish_connection();
        conn.run_pending_migrations(MIGRATIONS)
            .map(|_| ())
            .expect("failed to run migrations");
    })
    .await
    .expect("migration task panicked");

    let state = AppState {
        pool,
        config: Arc::new(AppConfig::from_env()),
    };

    let routes = Router::new()
        .merge(merchant::routes::get_routes())
        .merge(customer::routes::get_routes())
        .merge(checkin::routes::get_routes())
        .merge(billing::routes::get_routes())
        .with_state(state);
    let app = Router::new().nest("/api", routes).fallback(utils::handler_404);

    let mut listenfd = ListenFd::from_env();
    let listener = match listenfd.take_tcp_listener(0).unwrap() {
        // if we are given a tcp listener on listen fd 0, we use that one
        Some(listener) => {
            listener.set_nonblocking(true).unwrap();
            TcpListener::from_std(listener).unwrap()
        }
        // otherwise fall back to local listening
        None => {
            let addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_owned());
            TcpListener::bind(addr).await.unwrap()
        }
    };
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}
