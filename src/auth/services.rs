use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest};
use crate::auth::jwt::{JwtKeys, TokenKind};
use crate::auth::password::{check_new_password, hash_password, verify_password};
use crate::auth::repo_types::User;
use crate::error::{AppError, AppResult};
use crate::profile;
use crate::state::AppState;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex");
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn issue_tokens(keys: &JwtKeys, user: User) -> AppResult<AuthResponse> {
    let pair = keys.issue_pair(user.id)?;
    Ok(AuthResponse {
        access_token: pair.access,
        refresh_token: pair.refresh,
        user: PublicUser {
            id: user.id,
            email: user.email,
        },
    })
}

/// Creates the account and its company profile together, then signs the user in.
pub async fn register(
    state: &AppState,
    keys: &JwtKeys,
    req: RegisterRequest,
) -> AppResult<AuthResponse> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(AppError::validation("email", "Enter a valid email address."));
    }
    let company_name = req.company_name.trim();
    if company_name.is_empty() {
        return Err(AppError::validation("company_name", "Company name is required."));
    }
    check_new_password("password", &req.password, &req.confirm_password)?;

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::duplicate("email", "A user with that email already exists."));
    }

    let hash = hash_password(&req.password)?;

    let mut tx = state.db.begin().await.context("begin tx")?;
    let user = User::create_tx(&mut tx, &email, &hash).await?;
    profile::repo::create_tx(&mut tx, user.id, company_name).await?;
    tx.commit().await.context("commit tx")?;

    info!(user_id = %user.id, %email, "user registered");
    issue_tokens(keys, user)
}

pub async fn login(state: &AppState, keys: &JwtKeys, req: LoginRequest) -> AppResult<AuthResponse> {
    let email = normalize_email(&req.email);
    let invalid = || AppError::Unauthorized("invalid credentials".into());

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!(%email, "login for unknown email");
        return Err(invalid());
    };
    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(invalid());
    }

    info!(user_id = %user.id, "user logged in");
    issue_tokens(keys, user)
}

pub async fn refresh(state: &AppState, keys: &JwtKeys, refresh_token: &str) -> AppResult<AuthResponse> {
    let claims = keys
        .decode_kind(refresh_token, TokenKind::Refresh)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("user not found".into()))?;
    issue_tokens(keys, user)
}

pub async fn me(state: &AppState, user_id: Uuid) -> AppResult<PublicUser> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("user not found".into()))?;
    Ok(PublicUser {
        id: user.id,
        email: user.email,
    })
}
