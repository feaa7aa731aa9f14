// shop_server/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use cartflow::{FlowData, FlowOutcome};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::state::AppState;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginPayload {
  pub email: String,
  pub password: String,
}

#[instrument(name = "handler::register", skip(app_state, payload), fields(email = %payload.email))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<RegisterPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let ctx = FlowData::new(SignupCtxData {
    store: app_state.store.clone(),
    first_name: payload.first_name,
    last_name: payload.last_name,
    email: payload.email,
    password: payload.password,
    password_hash: None,
    created_user: None,
  });

  match app_state.flows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let user = ctx
        .read()
        .created_user
        .clone()
        .ok_or_else(|| AppError::Internal("signup completed without a user".to_string()))?;
      info!(user_id = user.id, "Registration successful.");
      Ok(HttpResponse::Created().json(user))
    }
    FlowOutcome::Halted => {
      warn!("Signup flow halted by a handler.");
      Err(AppError::Internal("registration halted".to_string()))
    }
  }
}

#[instrument(name = "handler::login", skip(app_state, payload), fields(email = %payload.email))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let ctx = FlowData::new(SigninCtxData {
    store: app_state.store.clone(),
    tokens: app_state.tokens.clone(),
    email: payload.email,
    password: payload.password,
    user: None,
    token: None,
  });

  match app_state.flows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let token = ctx
        .read()
        .token
        .clone()
        .ok_or_else(|| AppError::Internal("signin completed without a token".to_string()))?;
      Ok(HttpResponse::Ok().json(json!({ "token": token })))
    }
    FlowOutcome::Halted => {
      warn!("Signin flow halted by a handler.");
      Err(AppError::Internal("login halted".to_string()))
    }
  }
}
