mod config;

mod app;
mod ctx;
mod db;
mod errors;
mod field_set;
mod notes;
mod openapi;
mod shared;
mod state;
mod tasks;
mod users;

use std::net::SocketAddr;

use app::AppParams;
pub use config::config;
pub use db::{init_db, DB};
pub use errors::{Error, Result};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> errors::Result<()> {
    let config = config();

    shared::tracing::setup_tracing(config);

    let conn = init_db().await?;

    let (app, _api) = app::create(AppParams {
        db: conn,
        router: app::routes,
    })
    .await?;

    let app = shared::tracing::add_tracing_layer(app);

    let listener = TcpListener::bind(config.addr())
        .await
        .map_err(|e| Error::Unexpected(format!("cannot bind {}: {e}", config.addr())))?;

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("listening on http://{addr}");
    }

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Unexpected(e.to_string()))?;

    tracing::info!("server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {error}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
