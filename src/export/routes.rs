//! Download endpoint for proposal artifacts.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};

use super::exporter::ProposalExporter;
use super::model::{ExportKind, ExportOptions};
use crate::auth::AuthUser;
use crate::error::ExportError;
use crate::session::SessionRegistry;

/// Shared state for export routes.
#[derive(Clone)]
pub struct ExportRouteState {
    pub registry: Arc<SessionRegistry>,
    pub exporter: Arc<ProposalExporter>,
}

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        let status = match &self {
            ExportError::UnknownKind(_) => StatusCode::BAD_REQUEST,
            ExportError::InProgress => StatusCode::CONFLICT,
            ExportError::Generation(_) => StatusCode::BAD_GATEWAY,
            ExportError::Encoding { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}

/// POST /api/export/{kind}
///
/// Body is optional: `{"companyName": "...", "contactName": "..."}`.
async fn export_artifact(
    State(state): State<ExportRouteState>,
    user: AuthUser,
    Path(kind): Path<String>,
    body: Option<Json<ExportOptions>>,
) -> Response {
    let kind = match kind.parse::<ExportKind>() {
        Ok(kind) => kind,
        Err(e) => return e.into_response(),
    };
    let session = match state.registry.open(&user.user_id).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };
    let options = body.map(|Json(options)| options).unwrap_or_default();

    match state.exporter.export(&session, kind, options).await {
        Ok(artifact) => (
            [
                (header::CONTENT_TYPE, artifact.content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    content_disposition(&artifact.filename),
                ),
            ],
            artifact.bytes,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// `attachment` header for a filename built from user-supplied text.
///
/// `filename` gets an ASCII fallback with quotes, backslashes, control and
/// non-ASCII characters replaced; `filename*` carries the exact name
/// percent-encoded as UTF-8 (RFC 6266 / RFC 5987).
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut encoded = String::with_capacity(filename.len());
    for byte in filename.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }

    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

/// Build the export routes.
pub fn export_routes(state: ExportRouteState) -> Router {
    Router::new()
        .route("/api/export/{kind}", post(export_artifact))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn plain_filename_is_quoted_and_encoded() {
        assert_eq!(
            content_disposition("proposal-Acme-2025-03-07.docx"),
            "attachment; filename=\"proposal-Acme-2025-03-07.docx\"; \
             filename*=UTF-8''proposal-Acme-2025-03-07.docx"
        );
    }

    #[test]
    fn quotes_and_control_characters_cannot_escape_the_header() {
        let value = content_disposition("proposal-Evil\"; x=\"1\r\nSet-Cookie: a=b-2025-03-07.txt");
        assert_eq!(
            value,
            "attachment; filename=\"proposal-Evil_; x=_1__Set-Cookie: a=b-2025-03-07.txt\"; \
             filename*=UTF-8''proposal-Evil%22%3B%20x%3D%221%0D%0ASet-Cookie%3A%20a%3Db-2025-03-07.txt"
        );
        assert!(HeaderValue::from_str(&value).is_ok());
    }

    #[test]
    fn non_ascii_names_survive_in_the_encoded_form() {
        let value = content_disposition("proposal-Café-2025-03-07.pptx");
        assert!(value.contains("filename=\"proposal-Caf_-2025-03-07.pptx\""));
        assert!(value.ends_with("filename*=UTF-8''proposal-Caf%C3%A9-2025-03-07.pptx"));
        assert!(HeaderValue::from_str(&value).is_ok());
    }
}
