// shop_server/src/web/routes.rs

use actix_web::middleware::from_fn;
use actix_web::web;

use crate::errors::AppError;
use crate::web::handlers::{auth_handlers, cart_handlers, product_handlers};
use crate::web::middleware::require_identity;

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed JSON bodies get the same `{"error": ...}` envelope as every other failure.
fn json_config() -> web::JsonConfig {
  web::JsonConfig::default()
    .error_handler(|err, _req| AppError::Validation(format!("invalid request body: {}", err)).into())
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.app_data(json_config()).service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .route("/register", web::post().to(auth_handlers::register_handler))
      .route("/login", web::post().to(auth_handlers::login_handler))
      .service(
        web::resource("/products")
          .route(web::get().to(product_handlers::list_products_handler))
          .route(web::post().to(product_handlers::create_product_handler)),
      )
      .service(
        web::scope("/cart")
          .wrap(from_fn(require_identity))
          .route("/checkout", web::post().to(cart_handlers::checkout_handler)),
      ),
  );
}
