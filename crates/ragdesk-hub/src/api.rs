//! REST API server — the chat endpoint the widget talks to.
//!
//! Endpoints:
//! - POST /api/chat — Send a message, get the assistant reply and session id
//! - GET  /api/health — Health check

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tracing::{info, warn};

use ragdesk_core::chat::{ChatError, ChatInput, ChatReply, ChatService};

use crate::middleware::logging_middleware;

/// Shared API state.
pub struct ApiState {
    pub chat: ChatService,
}

type SharedState = Arc<ApiState>;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A chat failure rendered as a JSON error body with a fixed message.
pub struct ApiError(pub ChatError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            Json(ErrorResponse {
                error: self.0.public_message().to_string(),
            }),
        )
            .into_response()
    }
}

// ─── Handlers ──────────────────────────────────────────────

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn chat(
    State(state): State<SharedState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        warn!("Rejected chat body: {}", rejection.body_text());
        ApiError(ChatError::BadRequest(rejection.body_text()))
    })?;

    let input = ChatInput::from_json(&body).map_err(|e| {
        warn!("{}", e);
        ApiError(e)
    })?;

    state.chat.handle(input).await.map(Json).map_err(ApiError)
}

// ─── Server builder ────────────────────────────────────────

/// Build the API router.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/chat", post(chat))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

/// Start the API server.
pub async fn start_server(state: ApiState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("API server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header::CONTENT_TYPE, Request};
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use tower::ServiceExt;

    use ragdesk_core::chat::ChatConfig;
    use ragdesk_core::error::{RagDeskError, Result};
    use ragdesk_core::provider::{CompletionProvider, CompletionRequest, CompletionResponse};
    use ragdesk_core::session::SessionStore;

    enum Script {
        Reply(&'static str),
        Empty,
        Auth,
        Fail,
    }

    struct ScriptedProvider {
        script: Script,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
            self.prompts.lock().unwrap().push(request.input);
            match self.script {
                Script::Reply(text) => Ok(CompletionResponse {
                    output_text: Some(text.to_string()),
                    ..Default::default()
                }),
                Script::Empty => Ok(CompletionResponse::default()),
                Script::Auth => Err(RagDeskError::Auth("invalid key sk-secret".into())),
                Script::Fail => Err(RagDeskError::Other("socket closed at 10.0.0.3".into())),
            }
        }
    }

    fn app(script: Script) -> (Router, Arc<ScriptedProvider>, Arc<SessionStore>) {
        let provider = Arc::new(ScriptedProvider {
            script,
            prompts: Mutex::new(Vec::new()),
        });
        let store = Arc::new(SessionStore::new());
        let chat = ChatService::new(store.clone(), provider.clone(), ChatConfig::default());
        (build_router(Arc::new(ApiState { chat })), provider, store)
    }

    async fn post_chat(app: &Router, body: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_chat_round_trip_with_follow_up() {
        let (app, provider, _) = app(Script::Reply("X is Y. Sources: doc1"));

        let (status, body) = post_chat(&app, r#"{"message":"What is X?"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "X is Y. Sources: doc1");
        let session_id = body["sessionId"].as_str().unwrap().to_string();
        assert!(session_id.starts_with("session_"));

        let follow_up = serde_json::json!({ "message": "Why?", "sessionId": session_id });
        let (status, body) = post_chat(&app, &follow_up.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessionId"], session_id.as_str());

        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[1].contains("user: What is X?\nassistant: X is Y. Sources: doc1"));
    }

    #[tokio::test]
    async fn test_new_sessions_get_distinct_ids() {
        let (app, _, store) = app(Script::Reply("ok"));
        let (_, a) = post_chat(&app, r#"{"message":"a"}"#).await;
        let (_, b) = post_chat(&app, r#"{"message":"b"}"#).await;
        assert_ne!(a["sessionId"], b["sessionId"]);
        assert_eq!(store.count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_messages_are_rejected_without_state() {
        let (app, provider, store) = app(Script::Reply("ok"));

        for body in [
            r#"{}"#,
            r#"{"message":null}"#,
            r#"{"message":12}"#,
            r#"{"message":{"text":"hi"}}"#,
            r#"not json"#,
        ] {
            let (status, json) = post_chat(&app, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(json, serde_json::json!({ "error": "Message is required" }));
        }

        assert_eq!(store.count(), 0);
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_auth_failure_message() {
        let (app, _, _) = app(Script::Auth);
        let (status, json) = post_chat(&app, r#"{"message":"hi"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, serde_json::json!({ "error": "OpenAI API key not configured" }));
    }

    #[tokio::test]
    async fn test_failures_do_not_leak_detail() {
        for script in [Script::Empty, Script::Fail] {
            let (app, _, _) = app(script);
            let (status, json) = post_chat(&app, r#"{"message":"hi"}"#).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(json, serde_json::json!({ "error": "Failed to process chat request" }));
        }
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _, _) = app(Script::Reply("ok"));
        let req = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
    }
}
