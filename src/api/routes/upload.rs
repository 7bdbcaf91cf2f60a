//! Upload Routes (admin)
//!
//! - POST /api/admin/upload/image - Multipart `file`, jpg/jpeg/png/gif/webp up to 5 MB
//! - POST /api/admin/upload/video - Multipart `file`, mp4/avi/mov/wmv/flv/webm up to 50 MB
//!
//! Files land in `<upload_dir>/images` or `<upload_dir>/videos` and are served
//! back under `/uploads/...`.

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use crate::api::dto::UploadResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "wmv", "flv", "webm"];

/// One accepted upload category
#[derive(Debug, Clone, Copy)]
struct UploadKind {
    /// Subdirectory and URL segment
    dir: &'static str,
    /// Stored filename prefix
    prefix: &'static str,
    extensions: &'static [&'static str],
    label: &'static str,
}

const IMAGE: UploadKind = UploadKind {
    dir: "images",
    prefix: "image",
    extensions: IMAGE_EXTENSIONS,
    label: "image",
};

const VIDEO: UploadKind = UploadKind {
    dir: "videos",
    prefix: "video",
    extensions: VIDEO_EXTENSIONS,
    label: "video",
};

/// POST /api/admin/upload/image
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let limit = state.config.max_image_bytes;
    save_upload(&state, multipart, IMAGE, limit).await.map(Json)
}

/// POST /api/admin/upload/video
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let limit = state.config.max_video_bytes;
    save_upload(&state, multipart, VIDEO, limit).await.map(Json)
}

/// Lowercased extension of `filename` when it is one of `allowed`
fn accepted_extension(filename: &str, allowed: &[&str]) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    allowed.contains(&ext.as_str()).then_some(ext)
}

/// `<prefix>_<unix seconds>_<8 hex chars>.<ext>`
fn stored_filename(prefix: &str, ext: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}.{}", prefix, Utc::now().timestamp(), &suffix[..8], ext)
}

async fn save_upload(
    state: &AppState,
    mut multipart: Multipart,
    kind: UploadKind,
    max_bytes: usize,
) -> ApiResult<UploadResponse> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("invalid multipart body: {}", e.body_text())))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        let ext = accepted_extension(&original, kind.extensions).ok_or_else(|| {
            ApiError::Validation(format!(
                "unsupported {} format, expected one of: {}",
                kind.label,
                kind.extensions.join(", ")
            ))
        })?;

        let dir = state.config.upload_dir.join(kind.dir);
        tokio::fs::create_dir_all(&dir).await?;
        let filename = stored_filename(kind.prefix, &ext);
        let path = dir.join(&filename);

        let mut file = tokio::fs::File::create(&path).await?;
        let mut size: usize = 0;
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    drop(file);
                    discard(&path).await;
                    return Err(ApiError::Validation(format!(
                        "upload interrupted: {}",
                        e.body_text()
                    )));
                }
            };

            size += chunk.len();
            if size > max_bytes {
                drop(file);
                discard(&path).await;
                return Err(ApiError::PayloadTooLarge(format!(
                    "{} must not exceed {} MB",
                    kind.label,
                    max_bytes / (1024 * 1024)
                )));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::info!(
            filename = %filename,
            original = %original,
            size,
            kind = kind.label,
            "Stored upload"
        );

        return Ok(UploadResponse {
            url: format!("/uploads/{}/{}", kind.dir, filename),
            filename,
            size: size as u64,
        });
    }

    Err(ApiError::Validation("missing multipart field 'file'".to_string()))
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial upload");
    }
}
