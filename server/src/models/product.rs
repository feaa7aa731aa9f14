// shop_server/src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: i64,
  pub name: String,
  pub description: String,
  pub image: String,
  #[serde(with = "rust_decimal::serde::float")]
  pub price: Decimal,
  pub quantity: i32,
  pub created_at: DateTime<Utc>,
}

/// Body of `POST /products`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewProduct {
  pub name: String,
  pub description: String,
  pub image: String,
  #[serde(with = "rust_decimal::serde::float")]
  pub price: Decimal,
  pub quantity: i32,
}
