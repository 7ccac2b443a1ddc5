//! HTTP API server for integration with other systems.
//!
//! Exposes ingestion, question answering and session management over JSON.
//! One knowledge base is active at a time and shared by every request.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::YoutubotError;
use crate::orchestrator::{Orchestrator, SkippedVideo};
use crate::rag::{QueryEngine, RagResponse};
use crate::session::SessionStore;
use crate::source::{ContentKind, VideoMetadata};
use crate::transcription::TranscriptPolicy;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
    engine: QueryEngine,
    store: SessionStore,
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ingest", post(ingest))
        .route("/ask", post(ask))
        .route("/sessions", get(list_sessions))
        .route("/sessions/{name}/load", post(load_session))
        .route("/sessions/{name}", axum::routing::delete(delete_session))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let store = SessionStore::new(settings.sessions_dir());
    let orchestrator = Orchestrator::new(settings)?;
    let engine = orchestrator.build_query_engine()?;

    let state = Arc::new(AppState {
        orchestrator,
        engine,
        store,
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Youtubot API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Ingest", "POST   /ingest");
    Output::kv("Ask", "POST   /ask");
    Output::kv("List sessions", "GET    /sessions");
    Output::kv("Load session", "POST   /sessions/:name/load");
    Output::kv("Delete session", "DELETE /sessions/:name");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct IngestRequest {
    url: String,
    #[serde(default)]
    playlist: bool,
    #[serde(default = "default_lang")]
    lang: String,
    #[serde(default)]
    local_transcription: bool,
    /// Also save the result as a named session.
    #[serde(default)]
    save_as: Option<String>,
}

fn default_lang() -> String {
    "en".to_string()
}

#[derive(Serialize)]
struct IngestResponse {
    videos: Vec<VideoMetadata>,
    passages: usize,
    skipped: Vec<SkippedVideo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_as: Option<String>,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    answer_lang: Option<String>,
}

#[derive(Serialize)]
struct SessionListResponse {
    sessions: Vec<String>,
    total: usize,
}

#[derive(Serialize)]
struct LoadResponse {
    session: String,
    videos: Vec<VideoMetadata>,
    passages: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn status_for(error: &YoutubotError) -> StatusCode {
    match error {
        YoutubotError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        YoutubotError::InvalidSessionName(_) | YoutubotError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        YoutubotError::NoTranscripts => StatusCode::UNPROCESSABLE_ENTITY,
        YoutubotError::VideoSource(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: YoutubotError) -> Response {
    (
        status_for(&error),
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// Run synchronous session-store work (SQLite and file I/O) off the async executor.
async fn blocking<T, F>(work: F) -> crate::error::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| YoutubotError::Io(std::io::Error::other(format!("session task failed: {}", e))))?
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let knowledge = state.engine.knowledge().await;
    Json(serde_json::json!({
        "status": "ok",
        "loaded": knowledge.is_some(),
        "videos": knowledge.map(|k| k.videos.len()).unwrap_or(0),
    }))
}

async fn ingest(State(state): State<Arc<AppState>>, Json(req): Json<IngestRequest>) -> Response {
    if let Some(name) = &req.save_as {
        if let Err(e) = SessionStore::validate_name(name) {
            return error_response(e);
        }
    }

    let kind = if req.playlist {
        ContentKind::Playlist
    } else {
        ContentKind::Video
    };
    let policy = TranscriptPolicy::from_allow_local(req.local_transcription);

    let report = match state
        .orchestrator
        .ingest_with_policy(&req.url, kind, &req.lang, policy)
        .await
    {
        Ok(report) => report,
        Err(e) => {
            warn!("Ingest of {} failed: {}", req.url, e);
            return error_response(e);
        }
    };

    let mut knowledge = report.knowledge;
    if let Some(name) = req.save_as.clone() {
        let store = state.store.clone();
        let saved = blocking(move || store.save(&name, &knowledge).map(|()| knowledge)).await;
        knowledge = match saved {
            Ok(knowledge) => knowledge,
            Err(e) => return error_response(e),
        };
    }

    let response = IngestResponse {
        videos: knowledge.videos.clone(),
        passages: knowledge.index.len(),
        skipped: report.skipped,
        saved_as: req.save_as,
    };
    state.engine.load(knowledge).await;
    info!("Ingested {} over HTTP", req.url);

    Json(response).into_response()
}

async fn ask(State(state): State<Arc<AppState>>, Json(req): Json<AskRequest>) -> Json<RagResponse> {
    Json(state.engine.answer(&req.question, req.answer_lang.as_deref()).await)
}

async fn list_sessions(State(state): State<Arc<AppState>>) -> Response {
    let store = state.store.clone();
    match blocking(move || store.list()).await {
        Ok(sessions) => Json(SessionListResponse {
            total: sessions.len(),
            sessions,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn load_session(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    let store = state.store.clone();
    let session = name.clone();
    match blocking(move || store.load(&session)).await {
        Ok(knowledge) => {
            let response = LoadResponse {
                session: name,
                videos: knowledge.videos.clone(),
                passages: knowledge.index.len(),
            };
            state.engine.load(knowledge).await;
            Json(response).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn delete_session(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    let store = state.store.clone();
    let session = name.clone();
    match blocking(move || store.delete(&session)).await {
        Ok(true) => Json(serde_json::json!({ "deleted": name })).into_response(),
        Ok(false) => error_response(YoutubotError::SessionNotFound(name)),
        Err(e) => error_response(e),
    }
}
