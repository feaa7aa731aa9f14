// shop_server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub db_max_connections: u32,
  pub jwt_secret: String,
  pub jwt_expiration_secs: i64,
  pub checkout_deadline_ms: u64,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    let config = Self::from_lookup(|name| env::var(name).ok())?;
    tracing::info!(
      server_host = %config.server_host,
      server_port = config.server_port,
      db_max_connections = config.db_max_connections,
      checkout_deadline_ms = config.checkout_deadline_ms,
      "Application configuration loaded successfully."
    );
    Ok(config)
  }

  /// Builds the config from an arbitrary variable source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let required = |name: &str| {
      lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", name)))
    };

    let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse_or(&lookup, "SERVER_PORT", 8080u16)?;
    let database_url = required("DATABASE_URL")?;
    let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 10u32)?;
    let jwt_secret = required("JWT_SECRET")?;
    let jwt_expiration_secs = parse_or(&lookup, "JWT_EXPIRATION_SECS", 3600 * 24 * 7i64)?;
    let checkout_deadline_ms = parse_or(&lookup, "CHECKOUT_DEADLINE_MS", 5000u64)?;

    if jwt_expiration_secs <= 0 {
      return Err(AppError::Config("JWT_EXPIRATION_SECS must be positive".to_string()));
    }
    if checkout_deadline_ms == 0 {
      return Err(AppError::Config("CHECKOUT_DEADLINE_MS must be positive".to_string()));
    }

    Ok(Self {
      server_host,
      server_port,
      database_url,
      db_max_connections,
      jwt_secret,
      jwt_expiration_secs,
      checkout_deadline_ms,
    })
  }

  pub fn checkout_deadline(&self) -> Duration {
    Duration::from_millis(self.checkout_deadline_ms)
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match lookup(name) {
    None => Ok(default),
    Some(raw) => raw
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
  }
}

#[cfg(test)]
impl AppConfig {
  pub fn for_tests() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 0,
      database_url: "postgres://unused".to_string(),
      db_max_connections: 1,
      jwt_secret: "test-secret".to_string(),
      jwt_expiration_secs: 3600,
      checkout_deadline_ms: 2000,
    }
  }
}
