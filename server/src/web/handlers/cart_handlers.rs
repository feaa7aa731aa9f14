// shop_server/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::cart::CartCheckoutPayload;
use crate::pipelines::checkout_pipeline;
use crate::state::AppState;
use crate::web::middleware::AuthenticatedUser;

/// `POST /cart/checkout`. Responds `{"order_id", "total_price"}`.
#[instrument(
  name = "handler::checkout",
  skip(app_state, payload, auth_user),
  fields(user_id = auth_user.user_id, items = payload.items.len())
)]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<CartCheckoutPayload>,
) -> Result<HttpResponse, AppError> {
  let receipt = checkout_pipeline::run_checkout(app_state.get_ref(), auth_user.user_id, payload.into_inner()).await?;
  info!(order_id = receipt.order_id, "Checkout request completed.");
  Ok(HttpResponse::Ok().json(receipt))
}
