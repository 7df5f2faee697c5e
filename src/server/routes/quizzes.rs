//! Quiz endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{Error, Result};
use crate::quiz::validate_questions;
use crate::server::state::AppState;
use crate::types::quiz::{GradeReport, QuestionDraft, Quiz, QuizDraft};

#[derive(Debug, Deserialize)]
pub struct GenerateQuizRequest {
    pub topic: String,
}

/// POST /api/quizzes/generate - structured quiz generation grounded in the
/// caller's indexed documents. A schema failure aborts with nothing
/// persisted.
pub async fn generate_quiz(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<GenerateQuizRequest>,
) -> Result<Json<Quiz>> {
    if request.topic.trim().is_empty() {
        return Err(Error::InvalidInput("topic must not be empty".to_string()));
    }
    let quiz = state.quiz_service().generate(&user.id, &request.topic).await?;
    Ok(Json(quiz))
}

/// POST /api/quizzes - persist a client-supplied quiz after validation
pub async fn create_quiz(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(draft): Json<QuizDraft>,
) -> Result<Json<Quiz>> {
    let quiz = state.quiz_service().create(&user.id, &draft)?;
    Ok(Json(quiz))
}

/// GET /api/quizzes - caller's quizzes, newest first
pub async fn list_quizzes(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Quiz>>> {
    Ok(Json(state.db().list_quizzes(&user.id)?))
}

/// GET /api/quizzes/:id
pub async fn get_quiz(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Quiz>> {
    state
        .db()
        .get_quiz(&user.id, &id)?
        .map(Json)
        .ok_or_else(|| Error::NotFound("quiz".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuizRequest {
    pub title: Option<String>,
    /// Full replacement of the question set when present
    pub questions: Option<Vec<QuestionDraft>>,
}

/// PUT /api/quizzes/:id - update the title and/or replace the questions
pub async fn update_quiz(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateQuizRequest>,
) -> Result<Json<Quiz>> {
    let validated = request
        .questions
        .as_deref()
        .map(validate_questions)
        .transpose()?;

    state
        .db()
        .update_quiz(&user.id, &id, request.title.as_deref(), validated.as_deref())?
        .map(Json)
        .ok_or_else(|| Error::NotFound("quiz".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    /// Selected answer index per question, `null` for unanswered
    pub selected: Vec<Option<u32>>,
}

/// POST /api/quizzes/:id/grade - grade an answer sheet
pub async fn grade_quiz(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<GradeRequest>,
) -> Result<Json<GradeReport>> {
    let report = state.quiz_service().grade(&user.id, &id, &request.selected)?;
    Ok(Json(report))
}

/// DELETE /api/quizzes/:id
pub async fn delete_quiz(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    if !state.db().delete_quiz(&user.id, &id)? {
        return Err(Error::NotFound("quiz".to_string()));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}
