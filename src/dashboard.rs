//! Landing data for a signed-in user: profile, counters and the latest documents.

use axum::{extract::State, routing::get, Json, Router};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    documents::{dto::DocumentSummary, repo as documents_repo},
    error::{AppError, AppResult},
    profile::{dto::ProfileResponse, repo as profile_repo, services as profile_services},
    state::AppState,
};

pub const RECENT_DOCUMENTS: i64 = 5;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub profile: ProfileResponse,
    pub total_documents: i64,
    pub total_revenue: Decimal,
    pub recent_documents: Vec<DocumentSummary>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(get_dashboard))
}

/// Fails with `SetupRequired` until the company profile has real values.
pub async fn dashboard(state: &AppState, user_id: Uuid) -> AppResult<DashboardResponse> {
    let (profile, created) = profile_repo::get_or_create(&state.db, user_id).await?;
    if created || !profile.is_complete() {
        info!(%user_id, created, "dashboard blocked on profile setup");
        return Err(AppError::SetupRequired);
    }

    let stats = documents_repo::stats_for_user(&state.db, user_id).await?;
    let recent = documents_repo::list_by_user(&state.db, user_id, RECENT_DOCUMENTS, 0).await?;

    Ok(DashboardResponse {
        profile: profile_services::to_response(state, profile).await,
        total_documents: stats.total_documents,
        total_revenue: stats.total_revenue,
        recent_documents: recent.into_iter().map(DocumentSummary::from).collect(),
    })
}

#[instrument(skip(state))]
async fn get_dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<DashboardResponse>> {
    Ok(Json(dashboard(&state, user_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn dashboard_requires_authentication() {
        let app = router().with_state(AppState::fake());
        let res = app
            .oneshot(Request::get("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn response_shape() {
        let body = DashboardResponse {
            profile: ProfileResponse {
                company_name: "Acme Traders".into(),
                pan_number: "ABCDE1234F".into(),
                gst_number: None,
                phone: "9876543210".into(),
                address: "12 MG Road".into(),
                website: None,
                logo_url: None,
                is_complete: true,
            },
            total_documents: 0,
            total_revenue: Decimal::ZERO,
            recent_documents: vec![],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["total_documents"], 0);
        assert!(json["recent_documents"].as_array().unwrap().is_empty());
        assert_eq!(json["profile"]["is_complete"], true);
    }
}
