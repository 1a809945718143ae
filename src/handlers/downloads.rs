//! Purchased document delivery.
//!
//! - GET /api/download-pdf?reference=&preferences=

use crate::{
    error::AppError,
    extractors::Query,
    models::order::{OrderStatus, split_preferences},
    services::{
        content::{Document, PLACEHOLDER_PDF},
        order_service::validate_reference,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct DownloadPdfQuery {
    pub reference: Option<String>,
    #[serde(default)]
    pub preferences: String,
}

/// Resolve the document for a paid order.
///
/// # Response (200)
///
/// ```json
/// { "success": true, "pdfUrl": "https://.../sample-pdf-studio.pdf", "fileName": "Effideli-studio-Routine.pdf" }
/// ```
///
/// # Errors
///
/// - 400 no reference
/// - 404 no paid order with this reference
/// - 500 with `fallbackUrl`: anything else; the placeholder document is offered instead
pub async fn download_pdf(
    State(state): State<AppState>,
    Query(query): Query<DownloadPdfQuery>,
) -> Response {
    let reference = match query.reference.as_deref() {
        Some(reference) if !reference.trim().is_empty() => reference,
        _ => return AppError::Validation("Reference is required".to_string()).into_response(),
    };

    match paid_order_document(&state, reference, &query.preferences).await {
        Ok(document) => Json(json!({
            "success": true,
            "pdfUrl": document.url,
            "fileName": document.file_name,
        }))
        .into_response(),
        Err(e @ (AppError::NotFound(_) | AppError::Validation(_))) => e.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to resolve document, offering fallback");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Failed to get PDF URL",
                    "fallbackUrl": PLACEHOLDER_PDF,
                })),
            )
                .into_response()
        }
    }
}

async fn paid_order_document(
    state: &AppState,
    reference: &str,
    preferences: &str,
) -> Result<Document, AppError> {
    let reference = validate_reference(reference)?;
    let order = state
        .store
        .find_order_by_reference(reference)
        .await?
        .filter(|order| order.status == OrderStatus::Success)
        .ok_or(AppError::NotFound("Paid order"))?;

    Ok(state
        .catalog
        .order_document(&order.details, &split_preferences(preferences)))
}
