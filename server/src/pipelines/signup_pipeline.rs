// shop_server/src/pipelines/signup_pipeline.rs

use crate::errors::AppError;
use crate::models::user::NewUser;
use crate::pipelines::contexts::SignupCtxData;
use crate::services::auth_service;
use cartflow::{Flow, FlowControl, FlowData, FlowRegistry};
use tracing::{event, info, warn, Level};

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
  let len = value.chars().count();
  if len < min || len > max {
    return Err(AppError::Validation(format!(
      "{} must be between {} and {} characters",
      field, min, max
    )));
  }
  Ok(())
}

pub fn register_signup_pipeline(flows: &FlowRegistry<AppError>) {
  let mut p = Flow::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("check_existing_user", false, None),
    ("hash_password", false, None),
    ("create_user", false, None),
  ]);

  p.on_step("validate_signup_input", |ctx: FlowData<SignupCtxData>| {
    Box::pin(async move {
      let guard = ctx.read();
      check_length("firstName", guard.first_name.trim(), 2, 50)?;
      check_length("lastName", guard.last_name.trim(), 2, 50)?;
      let email = guard.email.trim();
      if email.is_empty() || !email.contains('@') {
        warn!("Invalid email format provided for signup.");
        return Err(AppError::Validation("a valid email is required".to_string()));
      }
      check_length("password", &guard.password, 8, 130)?;
      Ok::<_, AppError>(FlowControl::Continue)
    })
  });

  p.on_step("check_existing_user", |ctx: FlowData<SignupCtxData>| {
    Box::pin(async move {
      let (store, email) = {
        let guard = ctx.read();
        (guard.store.clone(), guard.email.trim().to_string())
      };
      event!(Level::DEBUG, email = %email, "Checking if email is already registered.");

      if store.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "Signup attempted with an existing email.");
        return Err(AppError::Validation(format!("user with email {} already exists", email)));
      }
      Ok::<_, AppError>(FlowControl::Continue)
    })
  });

  p.on_step("hash_password", |ctx: FlowData<SignupCtxData>| {
    Box::pin(async move {
      let password = ctx.read().password.clone();
      let hash = tokio::task::spawn_blocking(move || auth_service::hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {}", e)))??;
      ctx.write().password_hash = Some(hash);
      Ok::<_, AppError>(FlowControl::Continue)
    })
  });

  p.on_step("create_user", |ctx: FlowData<SignupCtxData>| {
    Box::pin(async move {
      let (store, new_user) = {
        let guard = ctx.read();
        let password_hash = guard
          .password_hash
          .clone()
          .ok_or_else(|| AppError::Internal("password hash missing before user creation".to_string()))?;
        (
          guard.store.clone(),
          NewUser {
            first_name: guard.first_name.trim().to_string(),
            last_name: guard.last_name.trim().to_string(),
            email: guard.email.trim().to_string(),
            password_hash,
          },
        )
      };

      let user = store.create_user(&new_user).await?;
      info!(user_id = user.id, email = %user.email, "User registered.");
      ctx.write().created_user = Some(user);
      Ok::<_, AppError>(FlowControl::Continue)
    })
  });

  flows.register_flow(p);
  info!("Signup flow registered.");
}
