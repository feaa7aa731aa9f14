// shop_server/src/pipelines/cart_rules.rs

//! Pure cart checks used by the checkout steps. Nothing here touches storage.

use crate::errors::AppError;
use crate::models::cart::CartItem;
use crate::models::product::Product;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Per-request id → product snapshot, taken under lock.
pub type ProductIndex = HashMap<i64, Product>;

/// One order line, priced at the snapshot's unit price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
  pub product_id: i64,
  pub quantity: i32,
  pub unit_price: Decimal,
}

pub fn validate_cart(items: &[CartItem]) -> Result<(), AppError> {
  if items.is_empty() {
    return Err(AppError::Validation("cart is empty".to_string()));
  }
  if let Some(bad) = items.iter().find(|item| item.quantity <= 0) {
    return Err(AppError::Validation(format!(
      "invalid quantity for product {}",
      bad.product_id
    )));
  }
  Ok(())
}

/// Distinct product ids in ascending order. Row locks are taken in this order.
pub fn distinct_product_ids(items: &[CartItem]) -> Vec<i64> {
  items.iter().map(|item| item.product_id).collect::<BTreeSet<_>>().into_iter().collect()
}

/// Indexes the fetched rows, failing on the first cart item whose product was
/// not returned.
pub fn index_products(items: &[CartItem], products: Vec<Product>) -> Result<ProductIndex, AppError> {
  let index: ProductIndex = products.into_iter().map(|p| (p.id, p)).collect();
  if let Some(missing) = items.iter().find(|item| !index.contains_key(&item.product_id)) {
    return Err(AppError::NotFound(format!(
      "product with id {} not available, please refresh cart",
      missing.product_id
    )));
  }
  Ok(index)
}

/// Accumulates demand per product in cart order and returns the totals keyed
/// by ascending product id. Fails on the first item that pushes its product's
/// demand above the snapshot quantity.
pub fn check_stock(items: &[CartItem], index: &ProductIndex) -> Result<BTreeMap<i64, i64>, AppError> {
  let mut demand: BTreeMap<i64, i64> = BTreeMap::new();
  for item in items {
    let product = index.get(&item.product_id).ok_or_else(|| {
      AppError::NotFound(format!(
        "product with id {} not available, please refresh cart",
        item.product_id
      ))
    })?;
    let wanted = demand.entry(item.product_id).or_insert(0);
    *wanted += i64::from(item.quantity);
    if *wanted > i64::from(product.quantity) {
      return Err(AppError::InsufficientStock(format!(
        "insufficient stock for product {}",
        product.name
      )));
    }
  }
  Ok(demand)
}

/// Total and lines for the cart, one line per cart entry.
pub fn price_cart(items: &[CartItem], index: &ProductIndex) -> Result<(Decimal, Vec<PricedLine>), AppError> {
  let mut total = Decimal::ZERO;
  let mut lines = Vec::with_capacity(items.len());
  for item in items {
    let product = index
      .get(&item.product_id)
      .ok_or_else(|| AppError::Internal(format!("product {} missing from index", item.product_id)))?;
    let next_total = product
      .price
      .checked_mul(Decimal::from(item.quantity))
      .and_then(|line| total.checked_add(line))
      .ok_or_else(|| AppError::Validation("order total out of range".to_string()))?;
    total = next_total;
    lines.push(PricedLine {
      product_id: item.product_id,
      quantity: item.quantity,
      unit_price: product.price,
    });
  }
  Ok((total, lines))
}

/// Snapshots with their quantity reduced by `demand`, ascending by id.
pub fn decremented(index: &ProductIndex, demand: &BTreeMap<i64, i64>) -> Result<Vec<Product>, AppError> {
  demand
    .iter()
    .map(|(id, wanted)| {
      let mut product = index
        .get(id)
        .cloned()
        .ok_or_else(|| AppError::Internal(format!("product {} missing from index", id)))?;
      let remaining = i64::from(product.quantity) - wanted;
      let quantity = i32::try_from(remaining)
        .ok()
        .filter(|q| *q >= 0)
        .ok_or_else(|| AppError::InsufficientStock(format!("insufficient stock for product {}", product.name)))?;
      product.quantity = quantity;
      Ok(product)
    })
    .collect()
}
