//! Caller identity.
//!
//! Authentication happens upstream; requests arrive with the user id in the
//! `x-user-id` header. Browsers cannot set headers on a WebSocket handshake,
//! so upgrade requests may carry it as a `user_id` query parameter instead.

use axum::Json;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use serde::Deserialize;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let user_id = from_header
            .or_else(|| websocket_query_user(parts))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({"error": "Missing x-user-id header"})),
                )
            })?;

        Ok(Self { user_id })
    }
}

#[derive(Deserialize)]
struct UserIdQuery {
    user_id: Option<String>,
}

/// The `user_id` query parameter, honoured only on WebSocket upgrades.
fn websocket_query_user(parts: &Parts) -> Option<String> {
    let upgrade = parts
        .headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())?;
    if !upgrade.eq_ignore_ascii_case("websocket") {
        return None;
    }
    Query::<UserIdQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(q)| q.user_id)
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(req: Request<()>) -> Result<AuthUser, StatusCode> {
        let (mut parts, _) = req.into_parts();
        AuthUser::from_request_parts(&mut parts, &())
            .await
            .map_err(|(status, _)| status)
    }

    #[tokio::test]
    async fn reads_trimmed_header() {
        let req = Request::builder()
            .header(USER_ID_HEADER, "  user-7 ")
            .body(())
            .unwrap();
        assert_eq!(extract(req).await.unwrap().user_id, "user-7");
    }

    #[tokio::test]
    async fn missing_or_blank_header_is_unauthorized() {
        let req = Request::builder().body(()).unwrap();
        assert_eq!(extract(req).await.unwrap_err(), StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .header(USER_ID_HEADER, "   ")
            .body(())
            .unwrap();
        assert_eq!(extract(req).await.unwrap_err(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn websocket_upgrade_may_use_query_parameter() {
        let req = Request::builder()
            .uri("/ws/session?user_id=user-9")
            .header(header::UPGRADE, "websocket")
            .body(())
            .unwrap();
        assert_eq!(extract(req).await.unwrap().user_id, "user-9");

        // The header still wins when both are present.
        let req = Request::builder()
            .uri("/ws/session?user_id=someone-else")
            .header(header::UPGRADE, "websocket")
            .header(USER_ID_HEADER, "user-9")
            .body(())
            .unwrap();
        assert_eq!(extract(req).await.unwrap().user_id, "user-9");
    }

    #[tokio::test]
    async fn plain_requests_ignore_query_parameter() {
        let req = Request::builder()
            .uri("/api/session?user_id=user-9")
            .body(())
            .unwrap();
        assert_eq!(extract(req).await.unwrap_err(), StatusCode::UNAUTHORIZED);
    }
}
