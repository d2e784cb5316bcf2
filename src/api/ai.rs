use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::AppState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptionRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionResponse {
    pub success: bool,
    pub description: String,
}

/// Generate a description for a site. Upstream failures fall back silently.
pub async fn generate_description(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DescriptionRequest>, JsonRejection>,
) -> Result<Json<DescriptionResponse>, ApiError> {
    let Json(request) = payload?;

    if request.title.trim().is_empty()
        || request.category.trim().is_empty()
        || request.link.trim().is_empty()
    {
        return Err(ApiError::bad_request("Title, category, and link are required"));
    }

    let description = state
        .describer
        .generate(&request.title, &request.category, &request.link)
        .await;

    Ok(Json(DescriptionResponse {
        success: true,
        description,
    }))
}
