use crate::handlers::RelayError;
use crate::services::invoker::GenerationResult;
use crate::services::payload::{inline_part_from_file, ModelPart};
use crate::services::upload::UploadForm;
use crate::startup::AppState;
use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, Multipart, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};

/// Text sent ahead of an uploaded document when no prompt is given.
pub const DOCUMENT_PROMPT: &str = "Analyze this document: ";

/// Text sent ahead of an uploaded audio clip when no prompt is given.
pub const AUDIO_PROMPT: &str = "Transcribe or Analyze the following audio:";

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
pub struct GenerateTextRequest {
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub output: String,
}

impl From<GenerationResult> for GenerateResponse {
    fn from(result: GenerationResult) -> Self {
        Self {
            output: result.output_text,
        }
    }
}

pub async fn generate_text(
    State(state): State<AppState>,
    body: Result<Json<GenerateTextRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, RelayError> {
    let Json(request) = body.map_err(|e| RelayError::InvalidBody(e.body_text()))?;
    let prompt = request.prompt.ok_or(RelayError::MissingField("prompt"))?;

    tracing::info!(prompt_len = prompt.len(), "Text generation requested");

    let result = state.invoker.invoke(&[ModelPart::text(prompt)]).await?;

    Ok(Json(result.into()))
}

pub async fn generate_from_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<GenerateResponse>, RelayError> {
    let multipart = multipart.map_err(|e| RelayError::InvalidBody(e.body_text()))?;
    let mut form = UploadForm::read(multipart, &state.config.uploads.dir, "image").await?;

    let image = form.take_file("image")?;
    let prompt = form
        .text("prompt")
        .ok_or(RelayError::MissingField("prompt"))?;
    let mime_type = state
        .config
        .uploads
        .image_mime
        .resolve(image.content_type());

    tracing::info!(
        size = image.size(),
        mime_type = %mime_type,
        "Image generation requested"
    );

    let image_part = inline_part_from_file(image.path(), mime_type).await?;
    let result = state
        .invoker
        .invoke(&[ModelPart::text(prompt), image_part])
        .await?;

    Ok(Json(result.into()))
}

pub async fn generate_from_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<GenerateResponse>, RelayError> {
    generate_from_attachment(&state, multipart, "document", DOCUMENT_PROMPT).await
}

pub async fn generate_from_audio(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<GenerateResponse>, RelayError> {
    generate_from_attachment(&state, multipart, "audio", AUDIO_PROMPT).await
}

/// Send the file in `field`, labelled with its declared content type, after
/// the request's `prompt` field or `default_prompt`.
async fn generate_from_attachment(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
    field: &'static str,
    default_prompt: &str,
) -> Result<Json<GenerateResponse>, RelayError> {
    let multipart = multipart.map_err(|e| RelayError::InvalidBody(e.body_text()))?;
    let mut form = UploadForm::read(multipart, &state.config.uploads.dir, field).await?;

    let upload = form.take_file(field)?;
    let prompt = form.text("prompt").unwrap_or(default_prompt);
    let mime_type = upload.content_type().unwrap_or(FALLBACK_MIME_TYPE);

    tracing::info!(
        field,
        size = upload.size(),
        mime_type = %mime_type,
        file_name = upload.file_name().unwrap_or(""),
        "Attachment generation requested"
    );

    let part = inline_part_from_file(upload.path(), mime_type).await?;
    let result = state
        .invoker
        .invoke(&[ModelPart::text(prompt), part])
        .await?;

    Ok(Json(result.into()))
}
