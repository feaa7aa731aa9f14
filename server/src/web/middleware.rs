// shop_server/src/web/middleware.rs

//! Request interceptors for protected routes.
//!
//! An [`InterceptorChain`] is an ordered list of [`Interceptor`]s. Each one
//! either lets the request through, lets it through as a resolved user, or
//! stops it with an error. [`require_identity`] runs the chain from
//! `AppState` via `actix_web::middleware::from_fn` and attaches the resolved
//! [`AuthenticatedUser`] to the request extensions; handlers read it back with
//! the `AuthenticatedUser` extractor.

use crate::errors::AppError;
use crate::services::token_service::TokenService;
use crate::state::AppState;
use crate::store::ShopStore;
use actix_web::body::MessageBody;
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::http::header;
use actix_web::middleware::Next;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
  pub user_id: i64,
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let identity = req.extensions().get::<AuthenticatedUser>().copied();
    futures_util::future::ready(identity.ok_or_else(|| {
      warn!("AuthenticatedUser requested on a route without the identity interceptor.");
      AppError::Auth("authentication required".to_string())
    }))
  }
}

/// The parts of a request interceptors may inspect.
#[derive(Debug, Clone)]
pub struct InboundRequest {
  pub method: String,
  pub path: String,
  pub authorization: Option<String>,
}

impl InboundRequest {
  fn from_service_request(req: &ServiceRequest) -> Self {
    InboundRequest {
      method: req.method().to_string(),
      path: req.path().to_string(),
      authorization: req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string),
    }
  }

  /// `Authorization: Bearer <token>`; a bare token is accepted as well.
  pub fn bearer_token(&self) -> Option<&str> {
    let raw = self.authorization.as_deref()?.trim();
    let token = raw
      .strip_prefix("Bearer ")
      .or_else(|| raw.strip_prefix("bearer "))
      .unwrap_or(raw)
      .trim();
    (!token.is_empty()).then_some(token)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
  Proceed,
  ProceedAs(AuthenticatedUser),
}

#[async_trait]
pub trait Interceptor: Send + Sync {
  fn name(&self) -> &'static str;
  async fn intercept(&self, req: &InboundRequest) -> Result<Verdict, AppError>;
}

#[derive(Default)]
pub struct InterceptorChain {
  interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, interceptor: impl Interceptor + 'static) -> Self {
    self.interceptors.push(Arc::new(interceptor));
    self
  }

  /// Runs every interceptor in order. The first error stops the chain; the
  /// last identity resolved wins.
  pub async fn resolve(&self, req: &InboundRequest) -> Result<Option<AuthenticatedUser>, AppError> {
    let mut identity = None;
    for interceptor in &self.interceptors {
      match interceptor.intercept(req).await {
        Ok(Verdict::Proceed) => {}
        Ok(Verdict::ProceedAs(user)) => identity = Some(user),
        Err(e) => {
          warn!(interceptor = interceptor.name(), method = %req.method, path = %req.path, error = %e, "Request rejected by interceptor.");
          return Err(e);
        }
      }
    }
    Ok(identity)
  }
}

/// Verifies the bearer token and resolves its subject through the user directory.
pub struct JwtAuthGate {
  tokens: TokenService,
  users: Arc<dyn ShopStore>,
}

impl JwtAuthGate {
  pub fn new(tokens: TokenService, users: Arc<dyn ShopStore>) -> Self {
    JwtAuthGate { tokens, users }
  }
}

#[async_trait]
impl Interceptor for JwtAuthGate {
  fn name(&self) -> &'static str {
    "jwt_auth"
  }

  async fn intercept(&self, req: &InboundRequest) -> Result<Verdict, AppError> {
    let token = req
      .bearer_token()
      .ok_or_else(|| AppError::Auth("missing bearer token".to_string()))?;
    let user_id = self.tokens.verify(token)?;

    match self.users.find_by_id(user_id).await? {
      Some(user) => {
        debug!(user_id = user.id, "Bearer token resolved to user.");
        Ok(Verdict::ProceedAs(AuthenticatedUser { user_id: user.id }))
      }
      None => Err(AppError::Auth(format!("unknown user {}", user_id))),
    }
  }
}

/// `from_fn` middleware for protected scopes.
pub async fn require_identity(
  req: ServiceRequest,
  next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
  let state = req
    .app_data::<web::Data<AppState>>()
    .cloned()
    .ok_or_else(|| AppError::Config("AppState is not registered as app data".to_string()))?;

  let inbound = InboundRequest::from_service_request(&req);
  match state.auth_chain.resolve(&inbound).await? {
    Some(identity) => {
      req.extensions_mut().insert(identity);
      next.call(req).await
    }
    None => Err(AppError::Auth("authentication required".to_string()).into()),
  }
}
