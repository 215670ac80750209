use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    documents::{
        dto::{DocumentDetails, DocumentForm, DocumentSummary, Pagination, RenderPayload},
        repo, services,
    },
    error::{AppError, AppResult},
    state::AppState,
    templates::{self, TemplateDescriptor},
};

pub fn template_routes() -> Router<AppState> {
    Router::new()
        .route("/templates", get(list_templates))
        .route("/templates/:id", get(get_template))
}

pub fn document_routes() -> Router<AppState> {
    Router::new()
        .route("/documents", get(list_documents).post(save_document))
        .route("/documents/preview", post(preview_document))
        .route("/documents/:id", get(get_document))
        .route("/documents/:id/render", get(render_document))
}

pub async fn list_templates() -> Json<Vec<TemplateDescriptor>> {
    Json(templates::all().to_vec())
}

pub async fn get_template(Path(id): Path<String>) -> Json<TemplateDescriptor> {
    Json(*templates::resolve_raw(Some(&id)))
}

#[instrument(skip(state, form))]
pub async fn preview_document(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(form): Json<DocumentForm>,
) -> AppResult<Json<RenderPayload>> {
    Ok(Json(services::preview(&state, user_id, &form).await?))
}

#[instrument(skip(state, form))]
pub async fn save_document(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(form): Json<DocumentForm>,
) -> AppResult<(StatusCode, HeaderMap, Json<DocumentDetails>)> {
    let saved = services::create_document(&state, user_id, &form).await?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/api/v1/documents/{}", saved.id))
        .map_err(|e| AppError::Persistence(e.into()))?;
    headers.insert(header::LOCATION, location);

    Ok((StatusCode::CREATED, headers, Json(saved)))
}

#[instrument(skip(state))]
pub async fn list_documents(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> AppResult<Json<Vec<DocumentSummary>>> {
    if p.limit < 1 || p.limit > 100 || p.offset < 0 {
        return Err(AppError::validation("limit", "limit must be 1..=100 and offset >= 0"));
    }
    let rows = repo::list_by_user(&state.db, user_id, p.limit, p.offset).await?;
    Ok(Json(rows.into_iter().map(DocumentSummary::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_document(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DocumentDetails>> {
    let (row, doc) = services::load_document(&state, user_id, id).await?;
    Ok(Json(services::details(&row, &doc)))
}

#[instrument(skip(state))]
pub async fn render_document(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RenderPayload>> {
    Ok(Json(services::render_saved(&state, user_id, id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn template_endpoint_falls_back_on_garbage() {
        let Json(t) = get_template(Path("<script>".to_string())).await;
        assert_eq!(t.id, 1);
        let Json(t) = get_template(Path("5".to_string())).await;
        assert_eq!(t.name, "Corporate Gray");
    }

    #[tokio::test]
    async fn template_list_is_ordered() {
        let Json(all) = list_templates().await;
        let ids: Vec<i32> = all.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }
}
