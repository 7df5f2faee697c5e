//! Document endpoints: upload, signed URLs, listing, deletion, reindex

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{Error, Result};
use crate::index::IndexReport;
use crate::server::state::AppState;
use crate::types::document::{Document, MediaType};

/// Upload response: the created document plus its indexing outcome
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub document: Document,
    pub index: IndexReport,
}

/// POST /api/documents - multipart upload, then extract, chunk, and index
pub async fn upload_document(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Internal(format!("failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| Error::InvalidInput("upload field has no filename".to_string()))?;

        // The allow-list check runs on the declared type before any bytes
        // are stored or indexed.
        let declared = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| {
                mime_guess::from_path(&filename)
                    .first_or_octet_stream()
                    .to_string()
            });
        let media_type = MediaType::from_mime(&declared)
            .ok_or_else(|| Error::UnsupportedMediaType(declared.clone()))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::Internal(format!("failed to read upload: {}", e)))?;

        tracing::info!("upload: {} ({} bytes) from {}", filename, data.len(), user.id);

        let storage_key = Document::storage_key_for(&user.id, &filename);
        state
            .object_store()
            .put(&storage_key, &data, media_type.as_mime())
            .await?;

        let response = ingest(&state, &user.id, &filename, media_type, &storage_key, &data).await?;
        return Ok(Json(response));
    }

    Err(Error::InvalidInput("no file field in upload".to_string()))
}

/// Shared ingest path: extract, persist the document row, chunk, index.
/// Extraction or indexing failures do not roll back already-stored bytes.
async fn ingest(
    state: &AppState,
    owner_id: &str,
    filename: &str,
    media_type: MediaType,
    storage_key: &str,
    data: &[u8],
) -> Result<IngestResponse> {
    let extracted = state.extractor().extract(data, media_type).await?;

    // Re-uploading the same filename replaces the previous registration;
    // segment ids are deterministic so re-indexing is idempotent.
    if let Some(existing) = state.db().find_document_by_key(owner_id, storage_key)? {
        state.db().delete_document_row(owner_id, &existing.id)?;
    }

    let document = Document {
        id: Uuid::new_v4(),
        owner_id: owner_id.to_string(),
        filename: filename.to_string(),
        storage_key: storage_key.to_string(),
        media_type,
        size_bytes: data.len() as u64,
        content_hash: extracted.content_hash(),
        segment_count: 0,
        uploaded_at: chrono::Utc::now(),
    };
    state.db().create_document(&document)?;

    let chunks = state.chunker().chunk_segments(&extracted.segments);
    let report = state.indexer().index_document(&document, &chunks).await?;
    state.db().set_segment_count(&document.id, chunks.len() as u32)?;

    let mut document = document;
    document.segment_count = chunks.len() as u32;

    Ok(IngestResponse {
        document,
        index: report,
    })
}

#[derive(Debug, Deserialize)]
pub struct UploadUrlRequest {
    pub filename: String,
    pub media_type: String,
}

#[derive(Debug, Serialize)]
pub struct UploadUrlResponse {
    pub url: String,
    pub storage_key: String,
    pub expires_in_secs: u64,
}

/// POST /api/documents/upload-url - signed PUT URL for a direct upload
pub async fn upload_url(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<UploadUrlRequest>,
) -> Result<Json<UploadUrlResponse>> {
    MediaType::from_mime(&request.media_type)
        .ok_or_else(|| Error::UnsupportedMediaType(request.media_type.clone()))?;

    let storage_key = Document::storage_key_for(&user.id, &request.filename);
    let ttl = state.signed_url_ttl();
    let url = state.object_store().upload_url(&storage_key, ttl).await?;

    Ok(Json(UploadUrlResponse {
        url,
        storage_key,
        expires_in_secs: ttl.as_secs(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub storage_key: String,
    pub filename: String,
    pub media_type: String,
}

/// POST /api/documents/register - index an object uploaded via a signed URL
pub async fn register_document(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<IngestResponse>> {
    // A caller can only register keys under their own prefix
    if !request.storage_key.starts_with(&format!("{}/", user.id)) {
        return Err(Error::NotAuthorized);
    }
    let media_type = MediaType::from_mime(&request.media_type)
        .ok_or_else(|| Error::UnsupportedMediaType(request.media_type.clone()))?;

    let data = state.object_store().get(&request.storage_key).await?;
    let response = ingest(
        &state,
        &user.id,
        &request.filename,
        media_type,
        &request.storage_key,
        &data,
    )
    .await?;
    Ok(Json(response))
}

/// GET /api/documents - caller's documents, newest first
pub async fn list_documents(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Document>>> {
    Ok(Json(state.db().list_documents(&user.id)?))
}

/// GET /api/documents/:id
pub async fn get_document(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>> {
    state
        .db()
        .get_document(&user.id, &id)?
        .map(Json)
        .ok_or_else(|| Error::NotFound("document".to_string()))
}

#[derive(Debug, Serialize)]
pub struct DownloadUrlResponse {
    pub url: String,
    pub expires_in_secs: u64,
}

/// GET /api/documents/:id/download-url - signed GET URL
pub async fn download_url(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DownloadUrlResponse>> {
    let document = state
        .db()
        .get_document(&user.id, &id)?
        .ok_or_else(|| Error::NotFound("document".to_string()))?;

    let ttl = state.signed_url_ttl();
    let url = state
        .object_store()
        .download_url(&document.storage_key, ttl)
        .await?;
    Ok(Json(DownloadUrlResponse {
        url,
        expires_in_secs: ttl.as_secs(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub filename: String,
}

/// PATCH /api/documents/:id - rename
pub async fn rename_document(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<Document>> {
    if request.filename.trim().is_empty() {
        return Err(Error::InvalidInput("filename must not be empty".to_string()));
    }
    if !state.db().rename_document(&user.id, &id, &request.filename)? {
        return Err(Error::NotFound("document".to_string()));
    }
    state
        .db()
        .get_document(&user.id, &id)?
        .map(Json)
        .ok_or_else(|| Error::NotFound("document".to_string()))
}

/// DELETE /api/documents/:id - remove the object, its vector entries, and
/// the rows. Vector entries that cannot be removed now are retried by the
/// background sweeper instead of being orphaned.
pub async fn delete_document(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let document = state
        .db()
        .get_document(&user.id, &id)?
        .ok_or_else(|| Error::NotFound("document".to_string()))?;

    state.object_store().delete(&document.storage_key).await?;
    state.indexer().remove_document(&document).await?;
    state.db().delete_document_row(&user.id, &id)?;

    tracing::info!("deleted document {} ({})", document.filename, document.id);
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// POST /api/documents/:id/reindex - re-extract and retry failed segments
pub async fn reindex_document(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<IndexReport>> {
    let document = state
        .db()
        .get_document(&user.id, &id)?
        .ok_or_else(|| Error::NotFound("document".to_string()))?;

    let data = state.object_store().get(&document.storage_key).await?;
    let extracted = state
        .extractor()
        .extract(&data, document.media_type)
        .await?;
    let chunks = state.chunker().chunk_segments(&extracted.segments);

    let report = state.indexer().reindex_failed(&document, &chunks).await?;
    Ok(Json(report))
}
