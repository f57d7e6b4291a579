//! Chat history endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState};
use crate::Error;
use crate::history::{ChatMessage, Exchange, HistorySummary};

/// Build history router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/chat-history", get(list_history))
        .route("/api/chat-history/search", get(search_history))
        .route("/api/chat-history/summary", get(summary))
        .route("/api/chat-history/{id}", delete(delete_exchange))
        .route("/api/clear-history", post(clear_history))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

/// Either every message, or one page of exchanges when `limit` is given
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum HistoryListing {
    Messages(Vec<ChatMessage>),
    Page(Vec<Exchange>),
}

async fn list_history(
    State(state): State<Arc<ApiState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<HistoryListing>, ApiError> {
    let Query(query) = query?;
    let history = state.history.read().await;
    let listing = match query.limit {
        Some(limit) => HistoryListing::Page(history.page(limit, query.offset)),
        None => HistoryListing::Messages(history.messages()),
    };
    Ok(Json(listing))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

async fn search_history(
    State(state): State<Arc<ApiState>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Exchange>>, ApiError> {
    let Query(query) = query?;
    Ok(Json(state.history.read().await.search(&query.q)))
}

async fn summary(State(state): State<Arc<ApiState>>) -> Json<HistorySummary> {
    Json(state.history.read().await.summary())
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

async fn delete_exchange(
    State(state): State<Arc<ApiState>>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let Path(id) = id?;
    if state.history.write().await.delete(id) {
        tracing::info!(id, "exchange deleted");
        Ok(Json(DeleteResponse { deleted: id }))
    } else {
        Err(Error::NotFound(format!("exchange {id}")).into())
    }
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: &'static str,
    pub deleted: usize,
}

async fn clear_history(State(state): State<Arc<ApiState>>) -> Json<ClearResponse> {
    let deleted = state.history.write().await.clear();
    Json(ClearResponse {
        message: "Chat history cleared",
        deleted,
    })
}
