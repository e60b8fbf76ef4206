//! Bearer-token authentication.
//!
//! Users are fixed in configuration with argon2 PHC password hashes. A
//! successful login yields an HS256 JWT carrying the username and role;
//! [`require_principal`] turns that token back into a [`Principal`] in the
//! request extensions for the API handlers to pick up.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::Response,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use loom_api::{
  ApiError, Envelope,
  extract::{Caller, JsonBody},
};
use loom_core::access::{Principal, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// A login account from the `[[users]]` configuration table.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAccount {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub role:          Role,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
  pub sub:  String,
  pub role: Role,
  pub iat:  usize,
  pub exp:  usize,
}

/// Credentials and signing keys for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub users:         Vec<UserAccount>,
  /// When false, requests without a token are served as [`Principal::public`].
  pub require_token: bool,
  pub token_ttl:     Duration,
  encoding:          EncodingKey,
  decoding:          DecodingKey,
}

impl AuthConfig {
  pub fn new(secret: &str, token_ttl: Duration, require_token: bool, users: Vec<UserAccount>) -> Self {
    Self {
      users,
      require_token,
      token_ttl,
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
    }
  }

  /// Check a username/password pair against the configured accounts.
  pub fn authenticate(&self, username: &str, password: &str) -> Result<Principal, Error> {
    let account = self
      .users
      .iter()
      .find(|u| u.username == username)
      .ok_or(Error::InvalidCredentials)?;

    let parsed_hash =
      PasswordHash::new(&account.password_hash).map_err(|_| Error::InvalidCredentials)?;

    Argon2::default()
      .verify_password(password.as_bytes(), &parsed_hash)
      .map_err(|_| Error::InvalidCredentials)?;

    Ok(Principal::new(account.username.clone(), account.role))
  }

  pub fn issue(&self, principal: &Principal, now: DateTime<Utc>) -> Result<String, Error> {
    let claims = Claims {
      sub:  principal.username.clone(),
      role: principal.role,
      iat:  now.timestamp() as usize,
      exp:  (now + self.token_ttl).timestamp() as usize,
    };
    encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(Error::TokenIssue)
  }

  pub fn verify(&self, token: &str) -> Result<Principal, Error> {
    let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
      .map_err(Error::InvalidToken)?;
    Ok(Principal::new(data.claims.sub, data.claims.role))
  }
}

/// The token from an `Authorization: Bearer …` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

/// Middleware: resolve the caller and stash it in the request extensions.
///
/// A token that is present but fails verification is always rejected, even
/// when tokens are optional.
pub async fn require_principal(
  State(auth): State<Arc<AuthConfig>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  let principal = match bearer_token(req.headers()) {
    Some(token) => auth.verify(token)?,
    None if !auth.require_token => Principal::public(),
    None => return Err(Error::MissingToken),
  };
  req.extensions_mut().insert(principal);
  Ok(next.run(req).await)
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Credentials {
  username: String,
  password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  pub token:      String,
  pub user:       Principal,
  pub expires_at: DateTime<Utc>,
}

/// `POST /auth/login`
pub async fn login(
  State(auth): State<Arc<AuthConfig>>,
  JsonBody(body): JsonBody,
) -> Result<Envelope<Session>, ApiError> {
  let creds: Credentials = serde_json::from_value(body)
    .map_err(|_| Error::BadRequest("Username and password are required".into()))?;

  let user = auth.authenticate(&creds.username, &creds.password).inspect_err(|_| {
    tracing::warn!(username = %creds.username, "failed login");
  })?;

  let now = Utc::now();
  let token = auth.issue(&user, now)?;
  tracing::info!(username = %user.username, role = user.role.as_str(), "login");

  Ok(
    Envelope::ok(Session { token, user, expires_at: now + auth.token_ttl })
      .message("Login successful"),
  )
}

/// `POST /auth/logout`
///
/// Tokens are stateless; the client discards its copy.
pub async fn logout() -> Envelope<Value> {
  Envelope::ok(Value::Null).message("Logged out successfully")
}

/// `GET /auth/validate`
pub async fn validate(Caller(principal): Caller) -> Envelope<Principal> {
  Envelope::ok(principal).message("Token is valid")
}
