// shop_server/src/models/cart.rs

//! Request-scoped cart shapes. Never persisted as-is.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
  #[serde(rename = "productID")]
  pub product_id: i64,
  pub quantity: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCheckoutPayload {
  pub items: Vec<CartItem>,
  #[serde(default)]
  pub address: String,
}
