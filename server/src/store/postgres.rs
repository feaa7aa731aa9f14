// shop_server/src/store/postgres.rs

use super::{CheckoutUnit, OrderLedger, ProductCatalog, ShopStore, StoreError, StoreResult, UserDirectory};
use crate::models::order::NewOrder;
use crate::models::order_item::NewOrderItem;
use crate::models::product::{NewProduct, Product};
use crate::models::user::{NewUser, User};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

const PRODUCT_COLUMNS: &str = "id, name, description, image, price, quantity, created_at";
const USER_COLUMNS: &str = "id, first_name, last_name, email, password, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    PgStore { pool }
  }

  pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(database_url)
      .await?;
    Ok(Self::new(pool))
  }
}

#[async_trait]
impl UserDirectory for PgStore {
  #[instrument(name = "PgStore::find_by_id", skip(self), err(Display))]
  async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(user)
  }

  #[instrument(name = "PgStore::find_by_email", skip(self), err(Display))]
  async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
      .bind(email)
      .fetch_optional(&self.pool)
      .await?;
    Ok(user)
  }

  #[instrument(name = "PgStore::create_user", skip(self, user), fields(email = %user.email), err(Display))]
  async fn create_user(&self, user: &NewUser) -> StoreResult<User> {
    let created = sqlx::query_as::<_, User>(&format!(
      "INSERT INTO users (first_name, last_name, email, password) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
    ))
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .fetch_one(&self.pool)
    .await?;
    Ok(created)
  }
}

#[async_trait]
impl ShopStore for PgStore {
  #[instrument(name = "PgStore::begin_checkout", skip(self), err(Display))]
  async fn begin_checkout(&self) -> StoreResult<Arc<dyn CheckoutUnit>> {
    let tx = self.pool.begin().await?;
    debug!("Checkout transaction opened.");
    Ok(Arc::new(PgCheckoutUnit {
      tx: Mutex::new(Some(tx)),
    }))
  }

  #[instrument(name = "PgStore::list_products", skip(self), err(Display))]
  async fn list_products(&self) -> StoreResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
      .fetch_all(&self.pool)
      .await?;
    Ok(products)
  }

  #[instrument(name = "PgStore::create_product", skip(self, product), fields(name = %product.name), err(Display))]
  async fn create_product(&self, product: &NewProduct) -> StoreResult<Product> {
    let created = sqlx::query_as::<_, Product>(&format!(
      "INSERT INTO products (name, description, image, price, quantity) VALUES ($1, $2, $3, $4, $5) RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.image)
    .bind(product.price)
    .bind(product.quantity)
    .fetch_one(&self.pool)
    .await?;
    Ok(created)
  }
}

/// A checkout transaction. Rows read through `fetch_by_ids` are locked with
/// `FOR UPDATE` until commit or rollback; dropping the unit rolls back.
pub struct PgCheckoutUnit {
  tx: Mutex<Option<Transaction<'static, Postgres>>>,
}

#[async_trait]
impl ProductCatalog for PgCheckoutUnit {
  #[instrument(name = "PgCheckoutUnit::fetch_by_ids", skip(self), err(Display))]
  async fn fetch_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Product>> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::UnitClosed)?;
    // ORDER BY id fixes the lock acquisition order across concurrent checkouts.
    let products = sqlx::query_as::<_, Product>(&format!(
      "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    ))
    .bind(ids)
    .fetch_all(&mut **tx)
    .await?;
    Ok(products)
  }

  #[instrument(name = "PgCheckoutUnit::replace", skip(self, product), fields(product_id = product.id, quantity = product.quantity), err(Display))]
  async fn replace(&self, product: &Product) -> StoreResult<()> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::UnitClosed)?;
    let result = sqlx::query(
      "UPDATE products SET name = $1, description = $2, image = $3, price = $4, quantity = $5 WHERE id = $6",
    )
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.image)
    .bind(product.price)
    .bind(product.quantity)
    .bind(product.id)
    .execute(&mut **tx)
    .await?;
    if result.rows_affected() == 0 {
      return Err(StoreError::Missing {
        entity: "product",
        id: product.id,
      });
    }
    Ok(())
  }
}

#[async_trait]
impl OrderLedger for PgCheckoutUnit {
  #[instrument(name = "PgCheckoutUnit::create_order", skip(self, header), fields(user_id = header.user_id, total = %header.total), err(Display))]
  async fn create_order(&self, header: &NewOrder) -> StoreResult<i64> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::UnitClosed)?;
    let order_id: i64 =
      sqlx::query_scalar("INSERT INTO orders (user_id, total, status, address) VALUES ($1, $2, $3, $4) RETURNING id")
        .bind(header.user_id)
        .bind(header.total)
        .bind(header.status)
        .bind(&header.address)
        .fetch_one(&mut **tx)
        .await?;
    Ok(order_id)
  }

  #[instrument(name = "PgCheckoutUnit::create_order_item", skip(self, item), fields(order_id = item.order_id, product_id = item.product_id), err(Display))]
  async fn create_order_item(&self, item: &NewOrderItem) -> StoreResult<()> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::UnitClosed)?;
    sqlx::query("INSERT INTO order_items (order_id, product_id, quantity, price) VALUES ($1, $2, $3, $4)")
      .bind(item.order_id)
      .bind(item.product_id)
      .bind(item.quantity)
      .bind(item.price)
      .execute(&mut **tx)
      .await?;
    Ok(())
  }
}

#[async_trait]
impl CheckoutUnit for PgCheckoutUnit {
  async fn commit(&self) -> StoreResult<()> {
    let tx = self.tx.lock().await.take().ok_or(StoreError::UnitClosed)?;
    tx.commit().await?;
    debug!("Checkout transaction committed.");
    Ok(())
  }

  async fn rollback(&self) -> StoreResult<()> {
    let taken = self.tx.lock().await.take();
    if let Some(tx) = taken {
      tx.rollback().await?;
      debug!("Checkout transaction rolled back.");
    }
    Ok(())
  }
}
