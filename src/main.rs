//! Pattern Worksheets · practice sheet generator
//!
//! - Axum HTTP API + static selection form (./static/index.html)
//! - Question banks are `.xlsx` workbooks in the databases directory
//! - Each request samples questions and returns a two-page PDF
//!   (student worksheet + teacher answer key)
//!
//! Important env variables:
//!   PORT                  : u16 (default 3000)
//!   WORKSHEET_CONFIG_PATH : path to TOML config (directories, font, counts)
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

mod bank;
mod config;
mod domain;
mod error;
mod logic;
mod protocol;
mod routes;
mod sampler;
mod state;
mod telemetry;
mod util;
mod worksheet;

#[cfg(test)]
mod test_support;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Read-only state: config + bank store.
  let state = Arc::new(AppState::new());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "pattern_worksheets", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "pattern_worksheets", error = %e, "Failed to listen for shutdown signal");
    return;
  }
  info!(target: "pattern_worksheets", "Shutdown signal received");
}
