//! Admin candidate management, image upload and bulk import.
//!
//! Create and update accept either a JSON body or a `multipart/form-data` form whose
//! optional `image` part becomes the candidate's picture.

use crate::{
    api::{AppState, Params, Payload, handlers::categories::IdQuery},
    core::{
        candidates::{self, CandidateChanges, CandidateOverview},
        images,
        import::{self, ImportReport},
    },
    entities::CandidateModel,
    errors::{Error, Result},
};
use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

/// An uploaded image with its validated extension.
#[derive(Debug)]
pub struct UploadedImage {
    bytes: Bytes,
    extension: String,
}

/// Candidate fields sent as JSON or as a multipart form.
#[derive(Debug, Default, Deserialize)]
pub struct CandidateForm {
    id: Option<i32>,
    display_name: Option<String>,
    is_active: Option<bool>,
    #[serde(skip)]
    image: Option<UploadedImage>,
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        other => Err(Error::validation(format!("Invalid is_active value {other:?}"))),
    }
}

impl CandidateForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "id" => {
                    let text = field.text().await?;
                    let id = text
                        .trim()
                        .parse()
                        .map_err(|_| Error::validation(format!("Invalid id {text:?}")))?;
                    form.id = Some(id);
                }
                "display_name" => form.display_name = Some(field.text().await?),
                "is_active" => form.is_active = Some(parse_flag(&field.text().await?)?),
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    if bytes.is_empty() {
                        continue;
                    }
                    let extension = images::image_extension(&file_name).ok_or_else(|| {
                        Error::validation(format!(
                            "Unsupported image {file_name:?}; expected one of {}",
                            images::SUPPORTED_EXTENSIONS.join(", ")
                        ))
                    })?;
                    form.image = Some(UploadedImage { bytes, extension });
                }
                _ => {}
            }
        }
        Ok(form)
    }
}

impl<S> FromRequest<S> for CandidateForm
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| Error::validation(e.body_text()))?;
            Self::from_multipart(multipart).await
        } else {
            let Payload(form) = Payload::<Self>::from_request(req, state).await?;
            Ok(form)
        }
    }
}

async fn attach_image(
    state: &AppState,
    candidate_id: i32,
    image: &UploadedImage,
) -> Result<CandidateModel> {
    candidates::store_profile_image(
        state.db.as_ref(),
        &state.images,
        candidate_id,
        &image.bytes,
        &image.extension,
    )
    .await
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<CandidateOverview>>> {
    candidates::list_candidate_overviews(state.db.as_ref()).await.map(Json)
}

/// A candidate whose image cannot be stored is deleted again, so create is all or nothing.
pub async fn create(
    State(state): State<AppState>,
    form: CandidateForm,
) -> Result<Json<CandidateModel>> {
    let display_name = form.display_name.unwrap_or_default();
    let candidate =
        candidates::create_candidate(state.db.as_ref(), &display_name, form.is_active).await?;
    let Some(image) = form.image else {
        return Ok(Json(candidate));
    };

    match attach_image(&state, candidate.id, &image).await {
        Ok(candidate) => Ok(Json(candidate)),
        Err(e) => {
            warn!(candidate_id = candidate.id, "Image upload failed, removing candidate: {e}");
            if let Err(cleanup) = candidates::delete_candidate(state.db.as_ref(), candidate.id).await {
                error!(candidate_id = candidate.id, "Failed to remove candidate: {cleanup}");
            }
            Err(e)
        }
    }
}

pub async fn update(
    State(state): State<AppState>,
    form: CandidateForm,
) -> Result<Json<CandidateModel>> {
    let id = form.id.ok_or_else(|| Error::validation("A candidate id is required"))?;
    let changes = CandidateChanges {
        display_name: form.display_name,
        is_active: form.is_active,
    };
    let mut candidate = candidates::update_candidate(state.db.as_ref(), id, changes).await?;
    if let Some(image) = &form.image {
        candidate = attach_image(&state, candidate.id, image).await?;
    }
    Ok(Json(candidate))
}

pub async fn delete(
    State(state): State<AppState>,
    Params(query): Params<IdQuery>,
) -> Result<Json<Value>> {
    let candidate = candidates::delete_candidate(state.db.as_ref(), query.id).await?;
    if let Some(url) = candidate.profile_image_url {
        state.images.remove(&url).await;
    }
    Ok(Json(json!({ "success": true })))
}

/// Takes the multipart `file` part: a spreadsheet or a ZIP with a spreadsheet and images.
pub async fn import(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportReport>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        info!(file = %file_name, size = bytes.len(), "Importing candidates");

        return import::import_candidates(
            state.db.as_ref(),
            &state.images,
            &file_name,
            bytes.to_vec(),
            state.config.max_upload_bytes,
        )
        .await
        .map(Json);
    }
    Err(Error::validation("No file was uploaded"))
}
