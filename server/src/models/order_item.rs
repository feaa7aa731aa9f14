// shop_server/src/models/order_item.rs

use rust_decimal::Decimal;

/// One order line. `price` is the unit price at checkout time, independent
/// of later catalog changes.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
  pub order_id: i64,
  pub product_id: i64,
  pub quantity: i32,
  pub price: Decimal,
}
