use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    error::AppResult,
    password_reset::{
        dto::{
            CompleteResetRequest, RequestResetRequest, RequestResetResponse, ResetStatus,
            VerifyCodeRequest,
        },
        services::ResetFlow,
    },
    state::AppState,
};

pub fn reset_routes() -> Router<AppState> {
    Router::new()
        .route("/password-reset/request", post(request_reset))
        .route("/password-reset/verify", post(verify_code))
        .route("/password-reset/complete", post(complete_reset))
        .route("/password-reset/:reset_session", delete(abandon_reset))
}

#[instrument(skip(state, payload))]
pub async fn request_reset(
    State(state): State<AppState>,
    Json(payload): Json<RequestResetRequest>,
) -> AppResult<(StatusCode, Json<RequestResetResponse>)> {
    let issued = ResetFlow::from_state(&state)
        .request_reset(&payload.email, OffsetDateTime::now_utc())
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(RequestResetResponse {
            reset_session: issued.session_id,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn verify_code(
    State(state): State<AppState>,
    Json(payload): Json<VerifyCodeRequest>,
) -> AppResult<Json<ResetStatus>> {
    ResetFlow::from_state(&state)
        .verify_code(payload.reset_session, &payload.code, OffsetDateTime::now_utc())
        .await?;
    Ok(Json(ResetStatus { status: "verified" }))
}

#[instrument(skip(state, payload))]
pub async fn complete_reset(
    State(state): State<AppState>,
    Json(payload): Json<CompleteResetRequest>,
) -> AppResult<Json<ResetStatus>> {
    ResetFlow::from_state(&state)
        .set_new_password(
            payload.reset_session,
            &payload.new_password,
            &payload.confirm_password,
            OffsetDateTime::now_utc(),
        )
        .await?;
    Ok(Json(ResetStatus { status: "completed" }))
}

#[instrument(skip(state))]
pub async fn abandon_reset(
    State(state): State<AppState>,
    Path(reset_session): Path<Uuid>,
) -> StatusCode {
    ResetFlow::from_state(&state).abandon(reset_session).await;
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn complete_without_session_is_not_verified() {
        let state = AppState::fake();
        let err = complete_reset(
            State(state),
            Json(CompleteResetRequest {
                reset_session: Uuid::new_v4(),
                new_password: "long-enough-1".into(),
                confirm_password: "long-enough-1".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotVerified));
    }

    #[tokio::test]
    async fn abandon_unknown_session_is_no_content() {
        let state = AppState::fake();
        assert_eq!(
            abandon_reset(State(state), Path(Uuid::new_v4())).await,
            StatusCode::NO_CONTENT
        );
    }
}
