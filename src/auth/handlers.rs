use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            CheckAuthResponse, LoginRequest, LoginResponse, LogoutResponse, PublicUser,
            RegisterRequest, RegisterResponse,
        },
        jwt::{JwtKeys, MaybeUser},
        password::{hash_password, verify_dummy, verify_password},
        repo_types::User,
    },
    db::{is_unique_violation, now_unix},
    error::{AppError, AppResult},
    extract::ApiJson,
    premium,
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";
// users.username / users.email column widths
pub const MAX_USERNAME_LEN: usize = 80;
pub const MAX_EMAIL_LEN: usize = 120;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/check-auth", get(check_auth))
        .route("/logout", post(logout))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    if username.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(AppError::validation("Missing required fields"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::validation("Username too long"));
    }
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(AppError::validation("Email too long"));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }

    if User::find_by_username(&state.db, &username).await?.is_some() {
        warn!(%username, "username already registered");
        return Err(AppError::validation("Username already exists"));
    }
    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::validation("Email already exists"));
    }

    let password = payload.password;
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(anyhow::Error::from)??;

    let user = match User::create(&state.db, &username, &email, &hash).await {
        Ok(u) => u,
        // lost a race with a concurrent registration
        Err(e) if is_unique_violation(&e) => {
            let taken = User::find_by_username(&state.db, &username).await?.is_some();
            return Err(AppError::validation(if taken {
                "Username already exists"
            } else {
                "Email already exists"
            }));
        }
        Err(e) => return Err(e.into()),
    };

    let access_token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".into(),
            user_id: user.id,
            user: PublicUser::from(user),
            access_token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let identifier = payload.username_or_email.trim().to_string();
    if identifier.is_empty() || payload.password.is_empty() {
        return Err(AppError::validation("Missing username or password"));
    }

    let user = User::find_by_login(&state.db, &identifier).await?;
    let password = payload.password;

    let (user, ok) = tokio::task::spawn_blocking(move || match user {
        Some(u) => {
            let ok = verify_password(&password, &u.password_hash);
            (Some(u), ok)
        }
        None => (None, Ok(verify_dummy(&password))),
    })
    .await
    .map_err(anyhow::Error::from)?;

    let user = match (user, ok?) {
        (Some(u), true) => u,
        (Some(u), false) => {
            warn!(user_id = u.id, "login invalid password");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
        (None, _) => {
            warn!("login unknown user");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
    };

    let is_premium = if state.config.payments.enabled {
        Some(premium::repo::is_premium(&state.db, user.id, now_unix()).await?)
    } else {
        None
    };

    let access_token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = user.id, "user logged in");
    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        user_id: user.id,
        username: user.username.clone(),
        user: PublicUser::from(user),
        access_token,
        is_premium,
    }))
}

#[instrument(skip(state, user_id))]
pub async fn check_auth(
    State(state): State<AppState>,
    MaybeUser(user_id): MaybeUser,
) -> AppResult<Json<CheckAuthResponse>> {
    let user = match user_id {
        Some(id) => User::find_by_id(&state.db, id).await?.map(PublicUser::from),
        None => None,
    };
    Ok(Json(CheckAuthResponse { user }))
}

/// Tokens are stateless; the client drops its copy.
pub async fn logout() -> Json<LogoutResponse> {
    Json(LogoutResponse {
        message: "Logged out successfully".into(),
    })
}
