// shop_server/src/store/memory.rs

//! In-process store with the same atomicity as the Postgres one: an open
//! checkout unit holds the whole table set exclusively and works on a staged
//! copy that only replaces the live tables on commit.
//!
//! Test-only. It can inject a failure at any storage call
//! and counts catalog and ledger calls.

use super::{CheckoutUnit, OrderLedger, ProductCatalog, ShopStore, StoreError, StoreResult, UserDirectory};
use crate::models::order::{NewOrder, OrderStatus};
use crate::models::order_item::NewOrderItem;
use crate::models::product::{NewProduct, Product};
use crate::models::user::{NewUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
  FetchProducts,
  ReplaceProduct,
  CreateOrder,
  CreateOrderItem,
  Commit,
}

/// Order header row as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
  pub id: i64,
  pub user_id: i64,
  pub total: Decimal,
  pub status: OrderStatus,
  pub address: String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
  pub id: i64,
  pub order_id: i64,
  pub product_id: i64,
  pub quantity: i32,
  pub price: Decimal,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
  products: BTreeMap<i64, Product>,
  orders: BTreeMap<i64, Order>,
  order_items: Vec<OrderItem>,
  users: BTreeMap<i64, User>,
  next_product_id: i64,
  next_order_id: i64,
  next_order_item_id: i64,
  next_user_id: i64,
}

#[derive(Default)]
struct Shared {
  tables: Arc<Mutex<Tables>>,
  fail_point: parking_lot::Mutex<Option<FailPoint>>,
  commit_delay: parking_lot::Mutex<Option<Duration>>,
  catalog_calls: AtomicUsize,
  ledger_calls: AtomicUsize,
  units_opened: AtomicUsize,
}

impl Shared {
  fn check(&self, point: FailPoint) -> StoreResult<()> {
    if *self.fail_point.lock() == Some(point) {
      return Err(StoreError::Unavailable(format!("injected failure at {:?}", point)));
    }
    Ok(())
  }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
  shared: Arc<Shared>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts a product as-is, keeping its id.
  pub async fn seed_product(&self, product: Product) {
    let mut tables = self.shared.tables.lock().await;
    tables.next_product_id = tables.next_product_id.max(product.id);
    tables.products.insert(product.id, product);
  }

  pub async fn product(&self, id: i64) -> Option<Product> {
    self.shared.tables.lock().await.products.get(&id).cloned()
  }

  pub async fn orders(&self) -> Vec<Order> {
    self.shared.tables.lock().await.orders.values().cloned().collect()
  }

  pub async fn order_items(&self, order_id: i64) -> Vec<OrderItem> {
    let tables = self.shared.tables.lock().await;
    tables.order_items.iter().filter(|i| i.order_id == order_id).cloned().collect()
  }

  pub fn fail_at(&self, point: Option<FailPoint>) {
    *self.shared.fail_point.lock() = point;
  }

  /// Makes every commit sleep for `delay` before applying the staged tables.
  pub fn delay_commits(&self, delay: Option<Duration>) {
    *self.shared.commit_delay.lock() = delay;
  }

  pub fn catalog_calls(&self) -> usize {
    self.shared.catalog_calls.load(Ordering::SeqCst)
  }

  pub fn ledger_calls(&self) -> usize {
    self.shared.ledger_calls.load(Ordering::SeqCst)
  }

  pub fn units_opened(&self) -> usize {
    self.shared.units_opened.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl UserDirectory for MemoryStore {
  async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
    Ok(self.shared.tables.lock().await.users.get(&id).cloned())
  }

  async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
    let tables = self.shared.tables.lock().await;
    Ok(tables.users.values().find(|u| u.email == email).cloned())
  }

  async fn create_user(&self, user: &NewUser) -> StoreResult<User> {
    let mut tables = self.shared.tables.lock().await;
    if tables.users.values().any(|u| u.email == user.email) {
      return Err(StoreError::Unavailable(format!("unique violation on users.email ({})", user.email)));
    }
    tables.next_user_id += 1;
    let created = User {
      id: tables.next_user_id,
      first_name: user.first_name.clone(),
      last_name: user.last_name.clone(),
      email: user.email.clone(),
      password: user.password_hash.clone(),
      created_at: Utc::now(),
    };
    tables.users.insert(created.id, created.clone());
    Ok(created)
  }
}

#[async_trait]
impl ShopStore for MemoryStore {
  async fn begin_checkout(&self) -> StoreResult<Arc<dyn CheckoutUnit>> {
    let live = Arc::clone(&self.shared.tables).lock_owned().await;
    let staged = (*live).clone();
    self.shared.units_opened.fetch_add(1, Ordering::SeqCst);
    Ok(Arc::new(MemoryCheckoutUnit {
      shared: Arc::clone(&self.shared),
      state: Mutex::new(Some(OpenUnit { live, staged })),
    }))
  }

  async fn list_products(&self) -> StoreResult<Vec<Product>> {
    Ok(self.shared.tables.lock().await.products.values().cloned().collect())
  }

  async fn create_product(&self, product: &NewProduct) -> StoreResult<Product> {
    let mut tables = self.shared.tables.lock().await;
    tables.next_product_id += 1;
    let created = Product {
      id: tables.next_product_id,
      name: product.name.clone(),
      description: product.description.clone(),
      image: product.image.clone(),
      price: product.price,
      quantity: product.quantity,
      created_at: Utc::now(),
    };
    tables.products.insert(created.id, created.clone());
    Ok(created)
  }
}

struct OpenUnit {
  live: OwnedMutexGuard<Tables>,
  staged: Tables,
}

pub struct MemoryCheckoutUnit {
  shared: Arc<Shared>,
  state: Mutex<Option<OpenUnit>>,
}

#[async_trait]
impl ProductCatalog for MemoryCheckoutUnit {
  async fn fetch_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Product>> {
    self.shared.catalog_calls.fetch_add(1, Ordering::SeqCst);
    self.shared.check(FailPoint::FetchProducts)?;
    let guard = self.state.lock().await;
    let unit = guard.as_ref().ok_or(StoreError::UnitClosed)?;
    Ok(
      unit
        .staged
        .products
        .values()
        .filter(|p| ids.contains(&p.id))
        .cloned()
        .collect(),
    )
  }

  async fn replace(&self, product: &Product) -> StoreResult<()> {
    self.shared.catalog_calls.fetch_add(1, Ordering::SeqCst);
    self.shared.check(FailPoint::ReplaceProduct)?;
    let mut guard = self.state.lock().await;
    let unit = guard.as_mut().ok_or(StoreError::UnitClosed)?;
    match unit.staged.products.get_mut(&product.id) {
      Some(row) => {
        *row = product.clone();
        Ok(())
      }
      None => Err(StoreError::Missing {
        entity: "product",
        id: product.id,
      }),
    }
  }
}

#[async_trait]
impl OrderLedger for MemoryCheckoutUnit {
  async fn create_order(&self, header: &NewOrder) -> StoreResult<i64> {
    self.shared.ledger_calls.fetch_add(1, Ordering::SeqCst);
    self.shared.check(FailPoint::CreateOrder)?;
    let mut guard = self.state.lock().await;
    let unit = guard.as_mut().ok_or(StoreError::UnitClosed)?;
    let tables = &mut unit.staged;
    tables.next_order_id += 1;
    let id = tables.next_order_id;
    tables.orders.insert(
      id,
      Order {
        id,
        user_id: header.user_id,
        total: header.total,
        status: header.status,
        address: header.address.clone(),
        created_at: Utc::now(),
      },
    );
    Ok(id)
  }

  async fn create_order_item(&self, item: &NewOrderItem) -> StoreResult<()> {
    self.shared.ledger_calls.fetch_add(1, Ordering::SeqCst);
    self.shared.check(FailPoint::CreateOrderItem)?;
    let mut guard = self.state.lock().await;
    let unit = guard.as_mut().ok_or(StoreError::UnitClosed)?;
    let tables = &mut unit.staged;
    if !tables.orders.contains_key(&item.order_id) {
      return Err(StoreError::Missing {
        entity: "order",
        id: item.order_id,
      });
    }
    tables.next_order_item_id += 1;
    let id = tables.next_order_item_id;
    tables.order_items.push(OrderItem {
      id,
      order_id: item.order_id,
      product_id: item.product_id,
      quantity: item.quantity,
      price: item.price,
      created_at: Utc::now(),
    });
    Ok(())
  }
}

#[async_trait]
impl CheckoutUnit for MemoryCheckoutUnit {
  async fn commit(&self) -> StoreResult<()> {
    self.shared.check(FailPoint::Commit)?;
    let delay = *self.shared.commit_delay.lock();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    let OpenUnit { mut live, staged } = self.state.lock().await.take().ok_or(StoreError::UnitClosed)?;
    *live = staged;
    Ok(())
  }

  async fn rollback(&self) -> StoreResult<()> {
    self.state.lock().await.take();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::product;
  use rust_decimal_macros::dec;

  #[tokio::test]
  async fn uncommitted_unit_leaves_tables_untouched() {
    let store = MemoryStore::new();
    store.seed_product(product(1, dec!(10.00), 5)).await;

    let unit = store.begin_checkout().await.unwrap();
    let mut p = unit.fetch_by_ids(&[1]).await.unwrap().remove(0);
    p.quantity = 0;
    unit.replace(&p).await.unwrap();
    unit.rollback().await.unwrap();

    assert_eq!(store.product(1).await.unwrap().quantity, 5);
    assert!(matches!(unit.commit().await, Err(StoreError::UnitClosed)));
  }

  #[tokio::test]
  async fn commit_publishes_staged_writes() {
    let store = MemoryStore::new();
    store.seed_product(product(1, dec!(10.00), 5)).await;

    let unit = store.begin_checkout().await.unwrap();
    let order_id = unit
      .create_order(&NewOrder {
        user_id: 7,
        total: dec!(10.00),
        status: OrderStatus::Pending,
        address: String::new(),
      })
      .await
      .unwrap();
    unit
      .create_order_item(&NewOrderItem {
        order_id,
        product_id: 1,
        quantity: 1,
        price: dec!(10.00),
      })
      .await
      .unwrap();
    unit.commit().await.unwrap();

    assert_eq!(store.orders().await.len(), 1);
    assert_eq!(store.order_items(order_id).await.len(), 1);
    assert_eq!(store.ledger_calls(), 2);
  }

  #[tokio::test]
  async fn open_unit_blocks_a_second_unit_until_it_ends() {
    let store = MemoryStore::new();
    let first = store.begin_checkout().await.unwrap();

    let second = tokio::time::timeout(Duration::from_millis(50), store.begin_checkout()).await;
    assert!(second.is_err());

    drop(first);
    let second = tokio::time::timeout(Duration::from_millis(500), store.begin_checkout()).await;
    assert!(second.is_ok());
  }

  #[tokio::test]
  async fn fetch_omits_missing_ids_and_replace_rejects_them() {
    let store = MemoryStore::new();
    store.seed_product(product(2, dec!(1.50), 1)).await;

    let unit = store.begin_checkout().await.unwrap();
    let found = unit.fetch_by_ids(&[2, 999]).await.unwrap();
    assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2]);

    let ghost = product(999, dec!(1.00), 1);
    assert!(matches!(
      unit.replace(&ghost).await,
      Err(StoreError::Missing { entity: "product", id: 999 })
    ));
  }

  #[tokio::test]
  async fn injected_failure_surfaces_as_unavailable() {
    let store = MemoryStore::new();
    store.fail_at(Some(FailPoint::FetchProducts));
    let unit = store.begin_checkout().await.unwrap();
    assert!(matches!(unit.fetch_by_ids(&[1]).await, Err(StoreError::Unavailable(_))));
  }
}
