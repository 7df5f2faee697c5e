//! API routes

pub mod chats;
pub mod documents;
pub mod quizzes;
pub mod retrieve;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Documents
        .route(
            "/documents",
            post(documents::upload_document).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/documents", get(documents::list_documents))
        .route("/documents/upload-url", post(documents::upload_url))
        .route("/documents/register", post(documents::register_document))
        .route("/documents/:id", get(documents::get_document))
        .route("/documents/:id", patch(documents::rename_document))
        .route("/documents/:id", delete(documents::delete_document))
        .route("/documents/:id/download-url", get(documents::download_url))
        .route("/documents/:id/reindex", post(documents::reindex_document))
        // Chats
        .route("/chats", post(chats::create_chat))
        .route("/chats", get(chats::list_chats))
        .route("/chats/:id", get(chats::get_chat))
        .route("/chats/:id", delete(chats::delete_chat))
        .route("/chats/:id/messages", post(chats::send_message))
        // Quizzes
        .route("/quizzes/generate", post(quizzes::generate_quiz))
        .route("/quizzes", post(quizzes::create_quiz))
        .route("/quizzes", get(quizzes::list_quizzes))
        .route("/quizzes/:id", get(quizzes::get_quiz))
        .route("/quizzes/:id", put(quizzes::update_quiz))
        .route("/quizzes/:id", delete(quizzes::delete_quiz))
        .route("/quizzes/:id/grade", post(quizzes::grade_quiz))
        // Retrieval preview
        .route("/retrieve", post(retrieve::retrieve_context))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "kolos",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Study-document service with grounded chat and quiz generation",
        "endpoints": {
            "POST /api/documents": "Upload and index a document (multipart)",
            "POST /api/documents/upload-url": "Signed URL for a direct upload",
            "POST /api/documents/register": "Register and index a directly-uploaded object",
            "GET /api/documents": "List your documents",
            "GET /api/documents/:id/download-url": "Signed download URL",
            "POST /api/documents/:id/reindex": "Retry failed segments",
            "POST /api/chats/:id/messages": "Send a message, get a grounded reply",
            "POST /api/quizzes/generate": "Generate a quiz from your documents",
            "POST /api/quizzes/:id/grade": "Grade an answer sheet",
            "POST /api/retrieve": "Preview retrieved context for a query"
        }
    }))
}
