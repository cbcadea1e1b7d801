use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const SECRET_HEADER: &str = "x-ingest-secret";

#[derive(Clone, Debug)]
pub struct MockConfig {
    pub secret: String,
    pub slug: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            secret: "test-secret".to_string(),
            slug: "demo-board".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub source: Option<String>,
    pub created_at: String,
    pub votes: u32,
}

#[derive(Deserialize)]
pub struct CreateFeedback {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct UpvoteInput {
    pub feedback_id: String,
    #[serde(default)]
    pub board_slug: Option<String>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub slug: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default)]
pub struct Board {
    /// Newest last.
    pub items: Vec<PublicItem>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<MockConfig>,
    pub board: Arc<RwLock<Board>>,
}

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
        board: Arc::new(RwLock::new(Board::default())),
    };
    Router::new()
        .route("/api/ingest-info", get(ingest_info))
        .route("/api/feedback", post(create_feedback))
        .route("/api/public-feedback", get(list_public))
        .route("/api/public-upvote", post(upvote))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockConfig::default()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == state.config.secret)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "invalid ingest secret").into_response()
}

async fn ingest_info(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(serde_json::json!({ "slug": state.config.slug })).into_response()
}

async fn create_feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateFeedback>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let title = input.title.trim();
    if title.is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, "title is required").into_response();
    }
    let item = PublicItem {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        description: input.description,
        status: "open".to_string(),
        source: input.source,
        created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        votes: 0,
    };
    info!(id = %item.id, category = input.category.as_deref().unwrap_or("-"), "feedback created");
    state.board.write().await.items.push(item.clone());
    (StatusCode::CREATED, Json(serde_json::json!({ "id": item.id }))).into_response()
}

async fn list_public(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    if query.slug.as_deref() != Some(state.config.slug.as_str()) {
        return (StatusCode::NOT_FOUND, "unknown board").into_response();
    }
    let board = state.board.read().await;
    let limit = query.limit.unwrap_or(usize::MAX);
    let items: Vec<PublicItem> = board.items.iter().rev().take(limit).cloned().collect();
    debug!(count = items.len(), "listing public feedback");
    Json(serde_json::json!({ "items": items })).into_response()
}

async fn upvote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<UpvoteInput>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    if input
        .board_slug
        .as_deref()
        .is_some_and(|slug| slug != state.config.slug)
    {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "ok": false, "error": "unknown board" })),
        )
            .into_response();
    }
    let mut board = state.board.write().await;
    match board.items.iter_mut().find(|item| item.id == input.feedback_id) {
        Some(item) => {
            item.votes += 1;
            info!(id = %item.id, votes = item.votes, "upvoted");
            Json(serde_json::json!({ "ok": true, "votes": item.votes })).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "ok": false, "error": "feedback not found" })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_item_serializes_snake_case() {
        let item = PublicItem {
            id: "a1".to_string(),
            title: "Test".to_string(),
            description: None,
            status: "open".to_string(),
            source: Some("mobile".to_string()),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            votes: 3,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "a1");
        assert_eq!(json["created_at"], "2024-01-01T00:00:00Z");
        assert_eq!(json["votes"], 3);
        assert!(json["description"].is_null());
    }

    #[test]
    fn create_feedback_ignores_device_fields() {
        let input: CreateFeedback = serde_json::from_str(
            r#"{"title":"Dark mode","description":null,"source":"mobile","category":"feature","os_version":"17.4"}"#,
        )
        .unwrap();
        assert_eq!(input.title, "Dark mode");
        assert_eq!(input.category.as_deref(), Some("feature"));
    }

    #[test]
    fn create_feedback_rejects_missing_title() {
        let result: Result<CreateFeedback, _> = serde_json::from_str(r#"{"category":"bug"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn upvote_slug_is_optional() {
        let input: UpvoteInput = serde_json::from_str(r#"{"feedback_id":"a1"}"#).unwrap();
        assert_eq!(input.feedback_id, "a1");
        assert!(input.board_slug.is_none());
    }
}
