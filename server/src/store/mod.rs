// shop_server/src/store/mod.rs

//! Storage contracts used by the checkout, account and catalog paths.
//!
//! Checkout never talks to the pool directly: it asks a [`ShopStore`] for a
//! [`CheckoutUnit`], performs every read and write through it and then
//! commits. Dropping a unit without committing discards its writes.

use crate::models::order::NewOrder;
use crate::models::order_item::NewOrderItem;
use crate::models::product::{NewProduct, Product};
use crate::models::user::{NewUser, User};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("{entity} {id} does not exist")]
  Missing { entity: &'static str, id: i64 },

  #[error("unit of work already committed or rolled back")]
  UnitClosed,

  /// Raised by the in-memory store's injected failures.
  #[cfg(test)]
  #[error("storage unavailable: {0}")]
  Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait ProductCatalog: Send + Sync {
  /// Products whose id is in `ids`, in ascending id order. Absent ids are
  /// omitted; inside a unit of work the returned rows stay locked until the
  /// unit ends.
  async fn fetch_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Product>>;

  /// Overwrites every mutable column of the row with `product.id`.
  async fn replace(&self, product: &Product) -> StoreResult<()>;
}

#[async_trait]
pub trait OrderLedger: Send + Sync {
  async fn create_order(&self, header: &NewOrder) -> StoreResult<i64>;
  async fn create_order_item(&self, item: &NewOrderItem) -> StoreResult<()>;
}

/// One atomic unit of work spanning catalog and ledger writes.
#[async_trait]
pub trait CheckoutUnit: ProductCatalog + OrderLedger {
  async fn commit(&self) -> StoreResult<()>;
  /// No-op when the unit is already closed.
  async fn rollback(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
  async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>>;
  async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
  async fn create_user(&self, user: &NewUser) -> StoreResult<User>;
}

#[async_trait]
pub trait ShopStore: UserDirectory {
  async fn begin_checkout(&self) -> StoreResult<Arc<dyn CheckoutUnit>>;
  async fn list_products(&self) -> StoreResult<Vec<Product>>;
  async fn create_product(&self, product: &NewProduct) -> StoreResult<Product>;
}
