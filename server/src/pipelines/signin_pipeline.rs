// shop_server/src/pipelines/signin_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use cartflow::{Flow, FlowControl, FlowData, FlowRegistry};
use tracing::{event, info, warn, Level};

/// Same message for unknown email and wrong password.
const BAD_CREDENTIALS: &str = "user not found, invalid email or password";

pub fn register_signin_pipeline(flows: &FlowRegistry<AppError>) {
  let mut p = Flow::<SigninCtxData, AppError>::new(&[
    ("validate_signin_input", false, None),
    ("fetch_user_by_email", false, None),
    ("verify_password", false, None),
    ("issue_token", false, None),
  ]);

  p.on_step("validate_signin_input", |ctx: FlowData<SigninCtxData>| {
    Box::pin(async move {
      let guard = ctx.read();
      if guard.email.trim().is_empty() || !guard.email.contains('@') {
        return Err(AppError::Validation("a valid email is required".to_string()));
      }
      if guard.password.is_empty() {
        return Err(AppError::Validation("password is required".to_string()));
      }
      Ok::<_, AppError>(FlowControl::Continue)
    })
  });

  p.on_step("fetch_user_by_email", |ctx: FlowData<SigninCtxData>| {
    Box::pin(async move {
      let (store, email) = {
        let guard = ctx.read();
        (guard.store.clone(), guard.email.trim().to_string())
      };

      match store.find_by_email(&email).await? {
        Some(user) => {
          event!(Level::DEBUG, user_id = user.id, "User found for signin.");
          ctx.write().user = Some(user);
          Ok::<_, AppError>(FlowControl::Continue)
        }
        None => {
          warn!(email = %email, "Signin for unknown email.");
          Err(AppError::Validation(BAD_CREDENTIALS.to_string()))
        }
      }
    })
  });

  p.on_step("verify_password", |ctx: FlowData<SigninCtxData>| {
    Box::pin(async move {
      let (stored_hash, password, user_id) = {
        let guard = ctx.read();
        let user = guard
          .user
          .as_ref()
          .ok_or_else(|| AppError::Internal("user missing before password check".to_string()))?;
        (user.password.clone(), guard.password.clone(), user.id)
      };

      let matches = tokio::task::spawn_blocking(move || auth_service::verify_password(&stored_hash, &password))
        .await
        .map_err(|e| AppError::Internal(format!("password verification task failed: {}", e)))??;
      if !matches {
        warn!(user_id = user_id, "Password mismatch on signin.");
        return Err(AppError::Validation(BAD_CREDENTIALS.to_string()));
      }
      Ok::<_, AppError>(FlowControl::Continue)
    })
  });

  p.on_step("issue_token", |ctx: FlowData<SigninCtxData>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      let user_id = guard
        .user
        .as_ref()
        .map(|u| u.id)
        .ok_or_else(|| AppError::Internal("user missing before token issue".to_string()))?;
      let token = guard.tokens.issue(user_id)?;
      guard.token = Some(token);
      info!(user_id = user_id, "Bearer token issued.");
      Ok::<_, AppError>(FlowControl::Continue)
    })
  });

  flows.register_flow(p);
  info!("Signin flow registered.");
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::services::token_service::TokenService;
  use crate::store::{MemoryStore, ShopStore};
  use crate::test_support::seed_user;
  use std::sync::Arc;

  fn signin(store: &MemoryStore, tokens: &TokenService, email: &str, password: &str) -> FlowData<SigninCtxData> {
    let store: Arc<dyn ShopStore> = Arc::new(store.clone());
    FlowData::new(SigninCtxData {
      store,
      tokens: tokens.clone(),
      email: email.to_string(),
      password: password.to_string(),
      user: None,
      token: None,
    })
  }

  fn registry() -> FlowRegistry<AppError> {
    let flows = FlowRegistry::new();
    register_signin_pipeline(&flows);
    flows
  }

  #[tokio::test]
  async fn valid_credentials_yield_token_for_user() {
    let store = MemoryStore::new();
    let user = seed_user(&store, "grace@example.com").await;
    let tokens = TokenService::new("secret", 60);

    let ctx = signin(&store, &tokens, "grace@example.com", "password123");
    registry().run(ctx.clone()).await.unwrap();

    let token = ctx.read().token.clone().unwrap();
    assert_eq!(tokens.verify(&token).unwrap(), user.id);
  }

  #[tokio::test]
  async fn wrong_password_and_unknown_email_look_the_same() {
    let store = MemoryStore::new();
    seed_user(&store, "grace@example.com").await;
    let tokens = TokenService::new("secret", 60);
    let flows = registry();

    let wrong = flows.run(signin(&store, &tokens, "grace@example.com", "nope-nope")).await.unwrap_err();
    let unknown = flows.run(signin(&store, &tokens, "nobody@example.com", "password123")).await.unwrap_err();
    for err in [wrong, unknown] {
      assert!(matches!(err, AppError::Validation(m) if m == BAD_CREDENTIALS));
    }
  }
}
