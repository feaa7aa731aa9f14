// shop_server/src/models/order.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::Type as SqlxType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Completed,
  Cancelled,
}

/// Order header as written by checkout; the ledger assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
  pub user_id: i64,
  pub total: Decimal,
  pub status: OrderStatus,
  pub address: String,
}
