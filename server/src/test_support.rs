// shop_server/src/test_support.rs

//! Fixtures shared by the unit test modules.

use crate::config::AppConfig;
use crate::models::product::Product;
use crate::models::user::{NewUser, User};
use crate::services::auth_service;
use crate::state::AppState;
use crate::store::{MemoryStore, UserDirectory};
use chrono::Utc;
use rust_decimal::Decimal;
use once_cell::sync::Lazy;
use std::sync::Arc;

pub const TEST_PASSWORD: &str = "password123";

/// Hashed once per test binary; argon2 is slow in debug builds.
static TEST_PASSWORD_HASH: Lazy<String> =
  Lazy::new(|| auth_service::hash_password(TEST_PASSWORD).expect("hash test password"));

pub fn product(id: i64, price: Decimal, quantity: i32) -> Product {
  Product {
    id,
    name: format!("product-{}", id),
    description: "test product".to_string(),
    image: "product.png".to_string(),
    price,
    quantity,
    created_at: Utc::now(),
  }
}

/// Creates a user whose password is [`TEST_PASSWORD`].
pub async fn seed_user(store: &MemoryStore, email: &str) -> User {
  store
    .create_user(&NewUser {
      first_name: "Test".to_string(),
      last_name: "User".to_string(),
      email: email.to_string(),
      password_hash: TEST_PASSWORD_HASH.clone(),
    })
    .await
    .expect("seed user")
}

pub fn state_with(store: MemoryStore, config: AppConfig) -> AppState {
  AppState::new(Arc::new(store), Arc::new(config))
}

pub fn test_state(store: MemoryStore) -> AppState {
  state_with(store, AppConfig::for_tests())
}
