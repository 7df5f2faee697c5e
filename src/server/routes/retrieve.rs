//! Retrieval preview endpoint

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    /// Concatenated matched chunk texts; empty when nothing matched
    pub context: String,
}

/// POST /api/retrieve - what a chat or quiz call would see as context
pub async fn retrieve_context(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>> {
    let context = state.retriever().retrieve(&request.query, &user.id).await?;
    Ok(Json(RetrieveResponse { context }))
}
