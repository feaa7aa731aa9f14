// shop_server/src/services/token_service.rs

//! Signed bearer tokens (HS256) carrying the acting user's id.

use crate::errors::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  pub sub: String,
  /// Same value as `sub`; kept under the name existing clients read.
  #[serde(rename = "userID")]
  pub user_id: String,
  pub iat: i64,
  pub exp: i64,
  pub jti: String,
}

#[derive(Clone)]
pub struct TokenService {
  encoding: EncodingKey,
  decoding: DecodingKey,
  lifetime_secs: i64,
}

impl TokenService {
  pub fn new(secret: &str, lifetime_secs: i64) -> Self {
    TokenService {
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
      lifetime_secs,
    }
  }

  #[instrument(name = "TokenService::issue", skip(self), err(Display))]
  pub fn issue(&self, user_id: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
      sub: user_id.to_string(),
      user_id: user_id.to_string(),
      iat: now.timestamp(),
      exp: (now + Duration::seconds(self.lifetime_secs)).timestamp(),
      jti: Uuid::new_v4().to_string(),
    };
    self.sign(&claims)
  }

  pub(crate) fn sign(&self, claims: &Claims) -> Result<String, AppError> {
    encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
      .map_err(|e| AppError::Internal(format!("failed to sign token: {}", e)))
  }

  /// Checks signature and expiry and returns the embedded user id.
  pub fn verify(&self, token: &str) -> Result<i64, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
      ErrorKind::ExpiredSignature => AppError::Auth("token expired".to_string()),
      ErrorKind::InvalidSignature => AppError::Auth("invalid token signature".to_string()),
      _ => AppError::Auth("invalid token".to_string()),
    })?;

    let user_id = data
      .claims
      .user_id
      .parse::<i64>()
      .map_err(|_| AppError::Auth("invalid token subject".to_string()))?;
    debug!(user_id = user_id, "Token verified.");
    Ok(user_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn issued_token_verifies_to_same_user() {
    let tokens = TokenService::new("secret", 60);
    let token = tokens.issue(42).unwrap();
    assert_eq!(tokens.verify(&token).unwrap(), 42);
  }

  #[test]
  fn other_secret_is_rejected() {
    let token = TokenService::new("secret-a", 60).issue(1).unwrap();
    let err = TokenService::new("secret-b", 60).verify(&token).unwrap_err();
    assert!(matches!(err, AppError::Auth(m) if m == "invalid token signature"));
  }

  #[test]
  fn expired_token_is_rejected() {
    let tokens = TokenService::new("secret", 60);
    let past = Utc::now().timestamp() - 3600;
    let token = tokens
      .sign(&Claims {
        sub: "1".into(),
        user_id: "1".into(),
        iat: past - 60,
        exp: past,
        jti: "t".into(),
      })
      .unwrap();
    assert!(matches!(tokens.verify(&token), Err(AppError::Auth(m)) if m == "token expired"));
  }

  #[test]
  fn garbage_and_bad_subject_are_rejected() {
    let tokens = TokenService::new("secret", 60);
    assert!(matches!(tokens.verify("not.a.jwt"), Err(AppError::Auth(_))));

    let token = tokens
      .sign(&Claims {
        sub: "abc".into(),
        user_id: "abc".into(),
        iat: Utc::now().timestamp(),
        exp: Utc::now().timestamp() + 60,
        jti: "t".into(),
      })
      .unwrap();
    assert!(matches!(tokens.verify(&token), Err(AppError::Auth(m)) if m == "invalid token subject"));
  }
}
