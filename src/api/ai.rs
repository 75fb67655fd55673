//! AI assistant API endpoints
//!
//! Chat and one-shot analyses run through the caller's own Anthropic
//! credentials; nothing here works without them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::Conversation;
use crate::services::{assistant::ConversationDetail, ChatInput, ChatReply};

/// Response for one-shot analyses
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub analysis: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/conversations", get(list_conversations))
        .route(
            "/conversations/{conversation_id}",
            get(get_conversation).delete(delete_conversation),
        )
}

/// POST /api/v1/ai/chat
async fn chat(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChatInput>,
) -> Result<Json<ChatReply>, ApiError> {
    let client = state.credential_service.claude_client(user.0.id).await?;
    let reply = state.assistant_service.chat(user.0.id, body, &client).await?;
    Ok(Json(reply))
}

/// GET /api/v1/ai/conversations
async fn list_conversations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let conversations = state.assistant_service.list_conversations(user.0.id).await?;
    Ok(Json(conversations))
}

/// GET /api/v1/ai/conversations/{conversation_id}
async fn get_conversation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<ConversationDetail>, ApiError> {
    let detail = state
        .assistant_service
        .get_conversation(user.0.id, conversation_id)
        .await?;
    Ok(Json(detail))
}

/// DELETE /api/v1/ai/conversations/{conversation_id}
async fn delete_conversation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(conversation_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .assistant_service
        .delete_conversation(user.0.id, conversation_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/projects/{project_id}/analyze-keywords
pub async fn analyze_keywords(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let client = state.credential_service.claude_client(user.0.id).await?;
    let analysis = state
        .assistant_service
        .analyze_keywords(user.0.id, project_id, &client)
        .await?;
    Ok(Json(AnalysisResponse { analysis }))
}

/// POST /api/v1/projects/{project_id}/keywords/{keyword_id}/analyze-serp
pub async fn analyze_serp(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((project_id, keyword_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let client = state.credential_service.claude_client(user.0.id).await?;
    let analysis = state
        .assistant_service
        .analyze_serp(user.0.id, project_id, keyword_id, &client)
        .await?;
    Ok(Json(AnalysisResponse { analysis }))
}
