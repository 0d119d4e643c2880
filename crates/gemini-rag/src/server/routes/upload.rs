//! Document upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::io::Write;
use std::path::Path;

use crate::error::{Error, ErrorKind, Result};
use crate::server::state::AppState;
use crate::types::UploadResponse;

/// Multipart field carrying the document
const FILE_FIELD: &str = "file";

/// POST /upload - ingest one uploaded file
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidInput(format!("Failed to read file: {}", e)))?;
        upload = Some((filename, data));
        break;
    }

    let (filename, data) =
        upload.ok_or_else(|| Error::InvalidInput("No file uploaded".to_string()))?;

    tracing::info!("Processing upload: {} ({} bytes)", filename, data.len());

    let upload_dir = state.config().server.upload_dir.clone();
    let safe_name = sanitize_filename(&filename);
    let temp = tokio::task::spawn_blocking(move || -> Result<tempfile::NamedTempFile> {
        std::fs::create_dir_all(&upload_dir)?;
        let mut temp = tempfile::Builder::new()
            .prefix("temp_")
            .suffix(&format!("_{}", safe_name))
            .tempfile_in(&upload_dir)?;
        temp.write_all(&data)?;
        temp.flush()?;
        Ok(temp)
    })
    .await
    .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

    let outcome = state.engine().ingest(temp.path()).await;

    let temp_path = temp.path().to_path_buf();
    if let Err(e) = temp.close() {
        tracing::warn!("Failed to remove temp file {}: {}", temp_path.display(), e);
    }

    match outcome {
        Ok(result) if result.error_kind == ErrorKind::QuotaExhausted => {
            Ok(Json(UploadResponse::quota_exhausted()))
        }
        Ok(_) => Ok(Json(UploadResponse::processed(&filename))),
        Err(e) if e.is_quota_exhausted() => Ok(Json(UploadResponse::quota_exhausted())),
        Err(e) => {
            tracing::error!("Upload of {} failed: {}", filename, e);
            Err(e)
        }
    }
}

/// Final path component with anything outside `[A-Za-z0-9._-]` replaced
fn sanitize_filename(filename: &str) -> String {
    let base = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
