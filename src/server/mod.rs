// src/server/mod.rs
//
// REST API over the model registry and the agent.

pub mod cors;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Json, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::agent::Agent;
use crate::config::Config;
use crate::error::Result;
use crate::io::{self, read_bounds_csv};
use crate::registry::{ModelManager, RegistryError};

/// Genome scale SBML files are well above axum's default body limit
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Mutex<Agent>>,
    pub manager: Arc<Mutex<ModelManager>>,
    pub upload_dir: PathBuf,
}

impl AppState {
    /// State sharing one registry between the agent's tools and the upload endpoints
    pub fn new(config: Config, client: reqwest::Client, manager: Arc<Mutex<ModelManager>>) -> Self {
        let upload_dir = config.upload_dir.clone();
        let agent = Agent::new(config, client, manager.clone());
        Self {
            agent: Arc::new(Mutex::new(agent)),
            manager,
            upload_dir,
        }
    }
}

// --- Request Bodies ---

#[derive(Deserialize, Debug)]
pub struct LlmConfigRequest {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ChatRequest {
    pub message: String,
}

// --- Router ---

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload_model/", post(upload_model))
        .route("/upload_csv/", post(upload_csv))
        .route("/get_stats/", get(get_stats))
        .route("/set_llm/", post(set_llm))
        .route("/chat/", post(chat))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(axum::middleware::from_fn(cors::cors_middleware))
        .with_state(state)
}

pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("metabolic-chat API listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn detail(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "detail": message.to_string() }))).into_response()
}

/// Final path component of an uploaded file name, `None` if nothing usable is left
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    match base {
        "" | "." | ".." => None,
        _ => Some(base.to_string()),
    }
}

/// Read the `file` field of a multipart upload
async fn read_upload(multipart: &mut Multipart) -> std::result::Result<(String, Vec<u8>), Response> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(detail(StatusCode::BAD_REQUEST, "No file uploaded.")),
            Err(e) => return Err(detail(StatusCode::BAD_REQUEST, e)),
        };
        if field.name() != Some("file") {
            continue;
        }
        let Some(file_name) = field.file_name().and_then(sanitize_file_name) else {
            return Err(detail(StatusCode::BAD_REQUEST, "Uploaded file has no name."));
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| detail(StatusCode::BAD_REQUEST, e))?;
        return Ok((file_name, bytes.to_vec()));
    }
}

async fn save_upload(dir: &Path, file_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

// --- Handlers ---

#[instrument(skip_all)]
async fn upload_model(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let (file_name, bytes) = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };
    if !io::is_model_file(&file_name) {
        return detail(
            StatusCode::BAD_REQUEST,
            "Invalid file format. Please upload an SBML file (.xml or .sbml) or a COBRA JSON file (.json)",
        );
    }
    let path = match save_upload(&state.upload_dir, &file_name, &bytes).await {
        Ok(path) => path,
        Err(e) => {
            error!("Failed to save {}: {}", file_name, e);
            return detail(StatusCode::INTERNAL_SERVER_ERROR, format!("Error processing file: {}", e));
        }
    };

    let mut manager = state.manager.lock().await;
    match manager.load_file(&path) {
        Ok(model_id) => {
            info!(model_id = %model_id, "Model uploaded");
            Json(json!({"status": "success", "model_id": model_id})).into_response()
        }
        Err(RegistryError::Load(e)) if e.is_parse_error() => {
            warn!("Rejected model upload {}: {}", file_name, e);
            detail(StatusCode::BAD_REQUEST, format!("Invalid SBML file: {}", e))
        }
        Err(e) => detail(StatusCode::INTERNAL_SERVER_ERROR, format!("Error processing file: {}", e)),
    }
}

#[instrument(skip_all)]
async fn upload_csv(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let (file_name, bytes) = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };
    let dir = state.upload_dir.join("bounds_data");
    let result = match save_upload(&dir, &file_name, &bytes).await {
        Ok(path) => read_bounds_csv(&path).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    match result {
        Ok(rows) => {
            state.manager.lock().await.set_bounds_data(rows);
            Json(json!({"status": "success", "filename": file_name})).into_response()
        }
        Err(e) => {
            warn!("Rejected bounds upload {}: {}", file_name, e);
            Json(json!({"status": "error", "detail": e})).into_response()
        }
    }
}

async fn get_stats(State(state): State<AppState>) -> Response {
    match state.manager.lock().await.stats() {
        Ok(stats) => Json(json!({"stats": stats, "status_code": 200})).into_response(),
        Err(e) => detail(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

#[instrument(skip_all)]
async fn set_llm(State(state): State<AppState>, Json(req): Json<LlmConfigRequest>) -> Response {
    let mut agent = state.agent.lock().await;
    match agent.set_llm(&req.provider, &req.model, req.api_key) {
        Ok(()) => Json(json!({
            "status": "LLM updated",
            "provider": req.provider,
            "model": req.model,
        }))
        .into_response(),
        Err(e) => detail(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to set LLM: {}", e)),
    }
}

#[instrument(skip_all)]
async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    let mut agent = state.agent.lock().await;
    match agent.query(&req.message).await {
        Ok(response) => Json(json!({ "response": response })).into_response(),
        Err(e) => {
            error!("Chat request failed: {:#}", e);
            detail(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_reduced_to_last_component() {
        assert_eq!(sanitize_file_name("e_coli_core.xml").as_deref(), Some("e_coli_core.xml"));
        assert_eq!(sanitize_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_file_name("C:\\models\\iML1515.xml").as_deref(), Some("iML1515.xml"));
        assert_eq!(sanitize_file_name("uploads/.."), None);
        assert_eq!(sanitize_file_name(""), None);
    }
}
