use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::jwt::{JwtKeys, TokenKind};
use crate::error::AppError;
use crate::state::AppState;

/// Extracts and validates an access JWT, returning the user ID.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing Authorization header".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("invalid auth scheme".into()))?;

        let claims = JwtKeys::from_ref(state)
            .decode_kind(token, TokenKind::Access)
            .map_err(|e| {
                warn!(error = %e, "bearer token rejected");
                AppError::Unauthorized("invalid or expired token".into())
            })?;

        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(state: &AppState, header: Option<String>) -> Result<AuthUser, AppError> {
        let mut builder = Request::builder().uri("/api/v1/me");
        if let Some(h) = header {
            builder = builder.header(axum::http::header::AUTHORIZATION, h);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn accepts_access_rejects_refresh() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user_id = Uuid::new_v4();

        let pair = keys.issue_pair(user_id).unwrap();
        let AuthUser(got) = extract(&state, Some(format!("Bearer {}", pair.access)))
            .await
            .unwrap();
        assert_eq!(got, user_id);

        assert!(extract(&state, Some(format!("Bearer {}", pair.refresh))).await.is_err());
    }

    #[tokio::test]
    async fn missing_or_malformed_header() {
        let state = AppState::fake();
        assert!(matches!(extract(&state, None).await, Err(AppError::Unauthorized(_))));
        assert!(extract(&state, Some("Basic abc".into())).await.is_err());
        assert!(extract(&state, Some("Bearer not.a.jwt".into())).await.is_err());
    }
}
