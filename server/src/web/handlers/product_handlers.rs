// shop_server/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::product::NewProduct;
use crate::state::AppState;

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products = app_state.store.list_products().await?;
  info!(count = products.len(), "Products listed.");
  Ok(HttpResponse::Ok().json(products))
}

fn validate_new_product(product: &NewProduct) -> Result<(), AppError> {
  for (field, value) in [
    ("name", &product.name),
    ("description", &product.description),
    ("image", &product.image),
  ] {
    if value.trim().is_empty() {
      return Err(AppError::Validation(format!("{} is required", field)));
    }
  }
  if product.price < Decimal::ZERO {
    return Err(AppError::Validation("price must not be negative".to_string()));
  }
  if product.quantity < 0 {
    return Err(AppError::Validation("quantity must not be negative".to_string()));
  }
  Ok(())
}

#[instrument(name = "handler::create_product", skip(app_state, payload), fields(name = %payload.name))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<NewProduct>,
) -> Result<HttpResponse, AppError> {
  validate_new_product(&payload)?;
  let product = app_state.store.create_product(&payload).await?;
  info!(product_id = product.id, "Product created.");
  Ok(HttpResponse::Created().json(product))
}
