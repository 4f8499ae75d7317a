use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::auth::model::{Role, User};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::state::AppState;

pub const TOKEN_COOKIE: &str = "token";

/// The authenticated principal: token verified and resolved against
/// the user store. A valid token whose user no longer exists is
/// rejected the same way as a missing or bad token.
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.0.role) {
            return Ok(());
        }
        Err(ApiError::Forbidden(format!(
            "User role \"{}\" is not authorized to access this route",
            self.0.role.as_str()
        )))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| cookie_token(&parts.headers))
            .ok_or(ApiError::Unauthorized)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|_| {
            warn!("invalid or expired session token");
            ApiError::Unauthorized
        })?;

        let user = state
            .users
            .get(claims.sub)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        Ok(CurrentUser(user))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("token="))
        .map(str::to_string)
}

/// HTTP-only session cookie carrying the signed token.
pub fn auth_cookie(token: &str, config: &AppConfig) -> String {
    let max_age = config.jwt.cookie_expire_days * 24 * 60 * 60;
    let mut cookie = format!("{TOKEN_COOKIE}={token}; Max-Age={max_age}; Path=/; HttpOnly");
    if config.environment == "production" {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Logout overwrites the cookie with an already-expired value; the
/// token itself stays valid until its expiry.
pub fn logout_cookie(config: &AppConfig) -> String {
    let mut cookie = format!("{TOKEN_COOKIE}=none; Max-Age=0; Path=/; HttpOnly");
    if config.environment == "production" {
        cookie.push_str("; Secure");
    }
    cookie
}
