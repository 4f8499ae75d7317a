use axum::{
    extract::{FromRef, Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            validate_password, ForgotPasswordRequest, LoginRequest, RegisterRequest,
            ResetPasswordRequest, TokenResponse, UserResponse,
        },
        extractors::{auth_cookie, logout_cookie, CurrentUser},
        jwt::JwtKeys,
        model::{PublicUser, Role, User},
        password::{hash_password, verify_password},
        reset,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", get(logout))
        .route("/auth/me", get(me))
        .route("/auth/forgotPassword", post(forgot_password))
        .route("/auth/resetPassword/:reset_token", put(reset_password))
}

/// Issues a session token as both an HTTP-only cookie and a JSON field.
fn token_response(
    state: &AppState,
    user: &User,
    status: StatusCode,
) -> Result<(StatusCode, HeaderMap, Json<TokenResponse>), ApiError> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.sign(user.id)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        auth_cookie(&token, &state.config)
            .parse()
            .map_err(anyhow::Error::new)?,
    );

    Ok((
        status,
        headers,
        Json(TokenResponse {
            status: true,
            token,
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<TokenResponse>), ApiError> {
    let profile = payload.validate()?;

    let users = state.users.list().await?;
    if users.iter().any(|u| u.matches_email(&profile.email)) {
        warn!(email = %profile.email, "email already registered");
        return Err(ApiError::Duplicate(format!(
            "Account with email address \"{}\" already exists!",
            profile.email
        )));
    }

    let user = User {
        id: Uuid::new_v4(),
        first_name: profile.first_name,
        last_name: profile.last_name,
        email: profile.email,
        role: Role::User,
        password: hash_password(&profile.password)?,
        reset_password_token: None,
        reset_password_expire: None,
        created_at: OffsetDateTime::now_utc(),
    };
    state.users.put(user.clone()).await?;

    // Best-effort welcome mail; a delivery failure never blocks registration.
    let welcome = format!(
        "Hi {}, your account has been created. Happy reading!",
        user.first_name
    );
    if let Err(e) = state
        .mailer
        .send(&user.email, "Welcome to the bookstore", &welcome)
        .await
    {
        warn!(error = %e, email = %user.email, "welcome email failed");
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    token_response(&state, &user, StatusCode::CREATED)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(StatusCode, HeaderMap, Json<TokenResponse>), ApiError> {
    let (email, password) = match (payload.email, payload.password) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            (email, password)
        }
        _ => {
            return Err(ApiError::BadRequest(
                "Please enter an email address & password".into(),
            ))
        }
    };

    // Unknown email and wrong password answer identically.
    let user = state
        .users
        .list()
        .await?
        .into_iter()
        .find(|u| u.matches_email(&email))
        .ok_or_else(|| {
            warn!(email = %email, "login unknown email");
            ApiError::InvalidCredentials
        })?;

    let ok = verify_password(&password, &user.password).unwrap_or_else(|e| {
        error!(error = %e, user_id = %user.id, "stored hash unreadable");
        false
    });
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    token_response(&state, &user, StatusCode::OK)
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
) -> Result<(HeaderMap, Json<Value>), ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        logout_cookie(&state.config)
            .parse()
            .map_err(anyhow::Error::new)?,
    );
    Ok((headers, Json(json!({ "status": true, "data": {} }))))
}

#[instrument(skip(current))]
pub async fn me(CurrentUser(current): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse {
        status: true,
        data: PublicUser::from(&current),
    })
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = payload
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Please enter an email address".into()))?;

    let user = state
        .users
        .list()
        .await?
        .into_iter()
        .find(|u| u.matches_email(&email))
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "No account with email address \"{email}\" exists"
            ))
        })?;

    let user_id = user.id;
    let token = reset::issue_reset_token(state.users.as_ref(), user.clone()).await?;
    let reset_url = format!(
        "{}/api/v1/auth/resetPassword/{}",
        state.config.public_url, token
    );
    let body = format!(
        "You are receiving this email because a password reset was requested for \
         your account. Please make a PUT request to: {reset_url}"
    );

    if let Err(e) = state
        .mailer
        .send(&user.email, "Password reset token", &body)
        .await
    {
        error!(error = %e, user_id = %user_id, "reset email failed, rolling back token");
        if let Some(stale) = state.users.get(user_id).await? {
            reset::clear_reset_token(state.users.as_ref(), stale).await?;
        }
        return Err(ApiError::EmailDelivery);
    }

    info!(user_id = %user_id, "password reset email sent");
    Ok(Json(json!({ "status": true, "data": "Email sent" })))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<(StatusCode, HeaderMap, Json<TokenResponse>), ApiError> {
    let mut user = reset::consume_reset_token(state.users.as_ref(), &reset_token)
        .await?
        .ok_or(ApiError::InvalidResetToken)?;

    let password = payload.password.unwrap_or_default();
    let messages = validate_password(&password);
    if !messages.is_empty() {
        return Err(ApiError::validation(messages));
    }

    user.password = hash_password(&password)?;
    user.reset_password_token = None;
    user.reset_password_expire = None;
    state.users.put(user.clone()).await?;

    info!(user_id = %user.id, "password reset");
    token_response(&state, &user, StatusCode::OK)
}
