// shop_server/src/state.rs
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::services::token_service::TokenService;
use crate::store::ShopStore;
use crate::web::middleware::{InterceptorChain, JwtAuthGate};
use cartflow::FlowRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn ShopStore>,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub tokens: TokenService,
  /// Runs ahead of every protected route.
  pub auth_chain: Arc<InterceptorChain>,
  pub config: Arc<AppConfig>,
}

impl AppState {
  /// Wires the token service, the interceptor chain and every flow around `store`.
  pub fn new(store: Arc<dyn ShopStore>, config: Arc<AppConfig>) -> Self {
    let tokens = TokenService::new(&config.jwt_secret, config.jwt_expiration_secs);
    let auth_chain = InterceptorChain::new().with(JwtAuthGate::new(tokens.clone(), store.clone()));

    let flows = FlowRegistry::new();
    pipelines::register_all_pipelines(&flows);

    AppState {
      store,
      flows: Arc::new(flows),
      tokens,
      auth_chain: Arc::new(auth_chain),
      config,
    }
  }
}
