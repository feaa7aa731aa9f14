// shop_server/src/pipelines/contexts.rs

//! Data the flows run over. Handlers receive these wrapped in
//! `cartflow::FlowData`.

use crate::models::cart::CartItem;
use crate::models::user::User;
use crate::pipelines::cart_rules::{PricedLine, ProductIndex};
use crate::services::token_service::TokenService;
use crate::store::{CheckoutUnit, ShopStore};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub store: Arc<dyn ShopStore>,
  pub user_id: i64,
  pub items: Vec<CartItem>,
  pub address: String,

  pub product_ids: Vec<i64>,
  /// Open unit of work; `None` before `open_unit_of_work` and after commit.
  pub unit: Option<Arc<dyn CheckoutUnit>>,
  pub products: ProductIndex,
  pub demand: BTreeMap<i64, i64>,
  pub lines: Vec<PricedLine>,
  pub total: Decimal,
  pub order_id: Option<i64>,
}

impl CheckoutCtxData {
  pub fn new(store: Arc<dyn ShopStore>, user_id: i64, items: Vec<CartItem>, address: String) -> Self {
    CheckoutCtxData {
      store,
      user_id,
      items,
      address,
      product_ids: Vec::new(),
      unit: None,
      products: ProductIndex::new(),
      demand: BTreeMap::new(),
      lines: Vec::new(),
      total: Decimal::ZERO,
      order_id: None,
    }
  }
}

#[derive(Clone)]
pub struct SignupCtxData {
  pub store: Arc<dyn ShopStore>,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub password: String,
  pub password_hash: Option<String>,
  pub created_user: Option<User>,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub store: Arc<dyn ShopStore>,
  pub tokens: TokenService,
  pub email: String,
  pub password: String,
  pub user: Option<User>,
  pub token: Option<String>,
}
