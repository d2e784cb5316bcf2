//! Site CRUD handlers and image orchestration.
//!
//! Image uploads always complete before the row that references them is
//! written. Removing an old or orphaned hosted image is best-effort: a
//! failure is logged and never fails the request.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Multipart, Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    truncate_category, truncate_site_url, truncate_title, validate_cover_image,
    validate_description, validate_image_content_type, validate_image_size, validate_required,
};
use crate::db::{CreateSiteRequest, NewSite, Site, SiteChanges, UpdateSiteRequest};
use crate::describe::is_known_category;
use crate::images::{extract_public_id, is_data_uri, ImagePayload, UploadedImage};
use crate::AppState;

/// Multipart field carrying the image file
const IMAGE_FIELD: &str = "image";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUploadResponse {
    pub message: String,
    pub image: UploadedImage,
}

/// Parsed multipart form: text fields plus an optional image file
#[derive(Debug, Default)]
struct SiteForm {
    title: Option<String>,
    site_url: Option<String>,
    category: Option<String>,
    description: Option<String>,
    cover_image: Option<String>,
    image: Option<ImagePayload>,
}

impl SiteForm {
    fn into_create(self) -> (CreateSiteRequest, Option<ImagePayload>) {
        let request = CreateSiteRequest {
            title: self.title.unwrap_or_default(),
            site_url: self.site_url.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            description: self.description,
            cover_image: self.cover_image,
        };
        (request, self.image)
    }

    fn into_update(self) -> (UpdateSiteRequest, Option<ImagePayload>) {
        let request = UpdateSiteRequest {
            title: self.title,
            site_url: self.site_url,
            category: self.category,
            description: self.description,
            cover_image: self.cover_image,
        };
        (request, self.image)
    }
}

/// Outcome of resolving the cover image for a write
struct CoverImage {
    url: Option<String>,
    uploaded: bool,
}

fn parse_site_id(id: &str) -> Result<i64, ApiError> {
    id.parse::<i64>()
        .map_err(|_| ApiError::bad_request(format!("Invalid site id: {}", id)))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::bad_request("File too large. Maximum size is 5MB.").with_error(err.body_text())
    } else {
        ApiError::bad_request("Invalid multipart form").with_error(err.body_text())
    }
}

async fn read_site_form(multipart: &mut Multipart, max_bytes: usize) -> Result<SiteForm, ApiError> {
    let mut form = SiteForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == IMAGE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(multipart_error)?;

            // Browsers send an empty part when no file was chosen
            if data.is_empty() && file_name.is_empty() {
                continue;
            }

            validate_image_content_type(&content_type)
                .map_err(|msg| ApiError::bad_request(msg.clone()).with_error(msg))?;
            validate_image_size(data.len(), max_bytes)
                .map_err(|msg| ApiError::bad_request(msg.clone()).with_error(msg))?;

            form.image = Some(ImagePayload::Bytes {
                data: data.to_vec(),
                content_type,
            });
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "title" => form.title = Some(value),
            "site_url" => form.site_url = Some(value),
            "category" => form.category = Some(value),
            "description" => form.description = Some(value),
            "cover_image" => form.cover_image = Some(value),
            other => tracing::debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

/// Upload a file or data-URI cover image; pass other values through.
///
/// An uploaded file takes precedence over a `cover_image` value.
async fn resolve_cover_image(
    state: &AppState,
    cover_image: Option<String>,
    file: Option<ImagePayload>,
) -> Result<CoverImage, ApiError> {
    let payload = match (file, cover_image) {
        (Some(file), _) => file,
        (None, Some(value)) if is_data_uri(&value) => ImagePayload::DataUri(value),
        (None, value) => {
            return Ok(CoverImage {
                url: value,
                uploaded: false,
            })
        }
    };

    let uploaded = state
        .images
        .upload(&payload, &state.config.images.folder)
        .await
        .map_err(|e| {
            warn!(error = %e, "Cover image upload failed");
            ApiError::from(e)
        })?;

    validate_cover_image(&uploaded.url).map_err(|msg| ApiError::validation_field("cover_image", msg))?;

    Ok(CoverImage {
        url: Some(uploaded.url),
        uploaded: true,
    })
}

/// Delete a hosted image by URL. Never fails; non-hosted URLs are skipped.
async fn remove_hosted_image(state: &AppState, site_id: i64, url: &str) {
    let Some(public_id) = extract_public_id(url) else {
        return;
    };

    match state.images.delete(&public_id).await {
        Ok(true) => info!(site_id, %public_id, "Deleted hosted image"),
        Ok(false) => warn!(site_id, %public_id, "Image store did not confirm deletion"),
        Err(e) => warn!(site_id, %public_id, error = %e, "Failed to delete hosted image"),
    }
}

async fn create_site_record(
    state: &AppState,
    request: CreateSiteRequest,
    file: Option<ImagePayload>,
) -> Result<Site, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("title", validate_required(&request.title, "Title"));
    errors.check("site_url", validate_required(&request.site_url, "Site URL"));
    errors.check("category", validate_required(&request.category, "Category"));
    errors.check("description", validate_description(request.description.as_deref()));
    if let Some(cover) = request.cover_image.as_deref().filter(|c| !is_data_uri(c)) {
        errors.check("cover_image", validate_cover_image(cover));
    }
    errors.finish()?;

    let cover = resolve_cover_image(state, request.cover_image, file).await?;

    let category = truncate_category(&request.category);
    if !is_known_category(&category) {
        warn!(%category, "Creating site with an unlisted category");
    }

    let new_site = NewSite {
        site_url: truncate_site_url(&request.site_url),
        title: truncate_title(&request.title),
        cover_image: cover.url.unwrap_or_default(),
        description: request.description.unwrap_or_default(),
        category,
    };

    let site = Site::create(&state.db, &new_site).await?;
    info!(site_id = site.id, title = %site.title, "Site created");
    Ok(site)
}

async fn update_site_record(
    state: &AppState,
    id: i64,
    request: UpdateSiteRequest,
    file: Option<ImagePayload>,
) -> Result<Site, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(title) = &request.title {
        errors.check("title", validate_required(title, "Title"));
    }
    if let Some(site_url) = &request.site_url {
        errors.check("site_url", validate_required(site_url, "Site URL"));
    }
    if let Some(category) = &request.category {
        errors.check("category", validate_required(category, "Category"));
    }
    if let Some(description) = &request.description {
        errors.check("description", validate_description(Some(description.as_str())));
    }
    if let Some(cover) = request.cover_image.as_deref().filter(|c| !is_data_uri(c)) {
        errors.check("cover_image", validate_cover_image(cover));
    }
    errors.finish()?;

    let existing = Site::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Site not found"))?;

    let cover = resolve_cover_image(state, request.cover_image, file).await?;

    let changes = SiteChanges {
        site_url: request.site_url.as_deref().map(truncate_site_url),
        title: request.title.as_deref().map(truncate_title),
        cover_image: cover.url.clone(),
        description: request.description,
        category: request.category.as_deref().map(truncate_category),
    };

    if changes.is_empty() {
        return Ok(existing);
    }

    let site = Site::update(&state.db, id, &changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Site not found"))?;

    info!(site_id = site.id, "Site updated");

    if cover.uploaded && existing.cover_image != site.cover_image {
        remove_hosted_image(state, id, &existing.cover_image).await;
    }

    Ok(site)
}

/// List all sites, newest first
pub async fn list_sites(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Site>>, ApiError> {
    let sites = Site::list(&state.db).await?;
    Ok(Json(sites))
}

pub async fn get_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Site>, ApiError> {
    let id = parse_site_id(&id)?;
    let site = Site::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Site not found"))?;

    Ok(Json(site))
}

pub async fn create_site(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateSiteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Site>), ApiError> {
    let Json(request) = payload?;
    let site = create_site_record(&state, request, None).await?;
    Ok((StatusCode::CREATED, Json(site)))
}

pub async fn update_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateSiteRequest>, JsonRejection>,
) -> Result<Json<Site>, ApiError> {
    let id = parse_site_id(&id)?;
    let Json(request) = payload?;
    let site = update_site_record(&state, id, request, None).await?;
    Ok(Json(site))
}

/// Delete a site and, best-effort, its hosted cover image
pub async fn delete_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_site_id(&id)?;

    if let Some(site) = Site::get_by_id(&state.db, id).await? {
        if !site.cover_image.is_empty() {
            remove_hosted_image(&state, id, &site.cover_image).await;
        }
    }

    if Site::delete(&state.db, id).await? {
        info!(site_id = id, "Site deleted");
    }

    Ok(Json(MessageResponse {
        message: "Site deleted".to_string(),
    }))
}

/// Upload a standalone image and return its hosted location
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImageUploadResponse>, ApiError> {
    let mut multipart = multipart?;
    let form = read_site_form(&mut multipart, state.config.images.max_upload_bytes).await?;
    let image = form
        .image
        .ok_or_else(|| ApiError::bad_request("No image file provided"))?;

    let uploaded = state
        .images
        .upload(&image, &state.config.images.folder)
        .await?;

    Ok(Json(ImageUploadResponse {
        message: "Image uploaded successfully".to_string(),
        image: uploaded,
    }))
}

pub async fn create_site_with_image(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Site>), ApiError> {
    let mut multipart = multipart?;
    let form = read_site_form(&mut multipart, state.config.images.max_upload_bytes).await?;
    let (request, file) = form.into_create();
    let site = create_site_record(&state, request, file).await?;
    Ok((StatusCode::CREATED, Json(site)))
}

pub async fn update_site_with_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Site>, ApiError> {
    let id = parse_site_id(&id)?;
    let mut multipart = multipart?;
    let form = read_site_form(&mut multipart, state.config.images.max_upload_bytes).await?;
    let (request, file) = form.into_update();
    let site = update_site_record(&state, id, request, file).await?;
    Ok(Json(site))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_site_id() {
        assert_eq!(parse_site_id("42").unwrap(), 42);
        let err = parse_site_id("abc").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_form_into_update_keeps_absent_fields_none() {
        let form = SiteForm {
            title: Some("New".to_string()),
            ..Default::default()
        };
        let (request, file) = form.into_update();
        assert_eq!(request.title.as_deref(), Some("New"));
        assert!(request.site_url.is_none());
        assert!(request.description.is_none());
        assert!(file.is_none());
    }

    #[test]
    fn test_form_into_create_defaults_to_empty() {
        let (request, _) = SiteForm::default().into_create();
        assert_eq!(request.title, "");
        assert!(request.description.is_none());
    }
}
