//! REST endpoints for the business profile form.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use super::collector::ProfileCollector;
use super::model::{CompanySize, ProfileDraft};
use crate::auth::AuthUser;
use crate::error::ProfileError;
use crate::session::SessionRegistry;

/// Shared state for profile routes.
#[derive(Clone)]
pub struct ProfileRouteState {
    pub collector: Arc<ProfileCollector>,
    pub sessions: Arc<SessionRegistry>,
}

/// GET /api/profile
///
/// Returns the saved profile, or 404 if the user has not submitted one.
async fn get_profile(
    State(state): State<ProfileRouteState>,
    user: AuthUser,
) -> impl IntoResponse {
    match state.collector.load(&user.user_id).await {
        Some(profile) => Json(serde_json::json!({ "profile": profile })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No profile exists yet"})),
        )
            .into_response(),
    }
}

/// POST /api/profile
///
/// Validates and saves the draft, then opens a fresh consultation session.
/// Field errors come back as `{"fields": {"companyEmail": "..."}}`.
async fn submit_profile(
    State(state): State<ProfileRouteState>,
    user: AuthUser,
    Json(draft): Json<ProfileDraft>,
) -> impl IntoResponse {
    match state.collector.submit(&user.user_id, &draft).await {
        Ok(profile) => {
            let session = state.sessions.start(&user.user_id, profile.clone()).await;
            (
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "profile": profile,
                    "session": session.snapshot().await,
                })),
            )
                .into_response()
        }
        Err(e) => {
            let status = match e {
                ProfileError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ProfileError::Persist(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(serde_json::json!({
                    "error": e.to_string(),
                    "fields": e.field_errors(),
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/profile/company-sizes
///
/// Options for the company size selector.
async fn company_sizes(_user: AuthUser) -> impl IntoResponse {
    let options: Vec<_> = CompanySize::ALL
        .iter()
        .map(|size| {
            serde_json::json!({
                "value": size.label(),
                "label": size.description(),
            })
        })
        .collect();
    Json(options)
}

/// Build the profile REST routes.
pub fn profile_routes(state: ProfileRouteState) -> Router {
    Router::new()
        .route("/api/profile", get(get_profile).post(submit_profile))
        .route("/api/profile/company-sizes", get(company_sizes))
        .with_state(state)
}
