// shop_server/src/main.rs

mod config;
mod errors;
mod models;
mod pipelines;
mod services;
mod state;
mod store;
mod web;

#[cfg(test)]
mod test_support;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::store::PgStore;

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);

  // LOG_FORMAT=json for machine-readable output.
  if std::env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false) {
    builder.json().init();
  } else {
    builder.init();
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();
  init_tracing();
  tracing::info!("Starting shop server...");

  let app_config = Arc::new(AppConfig::from_env().context("loading configuration")?);

  let store = PgStore::connect(&app_config.database_url, app_config.db_max_connections)
    .await
    .context("connecting to the database")?;
  tracing::info!(max_connections = app_config.db_max_connections, "Database pool ready.");

  let app_state = AppState::new(Arc::new(store), app_config.clone());

  let server_address = app_config.bind_address();
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("binding {}", server_address))?
  .run()
  .await?;

  Ok(())
}
