use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    profile::{
        dto::{GetProfileResponse, ProfileResponse, UpdateProfileRequest},
        repo, services,
    },
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route(
            "/profile/logo",
            // a little headroom over the logo limit for multipart framing
            put(upload_logo).layer(DefaultBodyLimit::max(services::MAX_LOGO_BYTES + 64 * 1024)),
        )
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<GetProfileResponse>> {
    let (profile, is_new) = repo::get_or_create(&state.db, user_id).await?;
    Ok(Json(GetProfileResponse {
        profile: services::to_response(&state, profile).await,
        is_new,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    Ok(Json(services::update_profile(&state, user_id, &payload).await?))
}

/// PUT /profile/logo (multipart, field `logo`)
#[instrument(skip(state, mp))]
pub async fn upload_logo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> AppResult<Json<ProfileResponse>> {
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation("logo", e.to_string()))?
    {
        if field.name() != Some("logo") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::validation("logo", e.to_string()))?;
        return Ok(Json(
            services::upload_logo(&state, user_id, &file_name, body).await?,
        ));
    }
    Err(AppError::validation("logo", "logo is required"))
}
