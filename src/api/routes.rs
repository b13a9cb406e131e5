//! HTTP handlers for the relay endpoints

use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};
use tracing::{error, warn};

use super::requests::{CreateIndexRequest, SearchRequest, UpsertRequest};
use crate::errors::RelayError;
use crate::relay::RelayService;

/// Application state shared by every worker
#[derive(Clone)]
pub struct AppState {
    pub relay: RelayService,
    pub password: String,
}

impl AppState {
    pub fn new(relay: RelayService, password: impl Into<String>) -> Self {
        Self {
            relay,
            password: password.into(),
        }
    }
}

/// Register the relay routes; expects `web::Data<AppState>` on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .route("/search", web::post().to(search))
        .route("/upsert", web::post().to(upsert))
        .route("/createIndex", web::post().to(create_index))
        .route("/health", web::get().to(health));
}

async fn search(
    state: web::Data<AppState>,
    body: web::Json<SearchRequest>,
) -> Result<HttpResponse, RelayError> {
    let params = body.into_inner().validate(&state.password).map_err(rejected)?;
    let matches = state.relay.search(params).await.map_err(failed)?;
    Ok(HttpResponse::Ok().json(matches))
}

async fn upsert(
    state: web::Data<AppState>,
    body: web::Json<UpsertRequest>,
) -> Result<HttpResponse, RelayError> {
    let params = body.into_inner().validate(&state.password).map_err(rejected)?;
    let ack = state.relay.upsert_document(params).await.map_err(failed)?;
    Ok(HttpResponse::Ok().json(ack))
}

async fn create_index(
    state: web::Data<AppState>,
    body: web::Json<CreateIndexRequest>,
) -> Result<HttpResponse, RelayError> {
    let params = body.into_inner().validate(&state.password).map_err(rejected)?;
    let ack = state.relay.create_index(params).await.map_err(failed)?;
    Ok(HttpResponse::Ok().json(ack))
}

async fn health(state: web::Data<AppState>) -> HttpResponse {
    let mut body = serde_json::json!({
        "status": "healthy",
        "service": "vector-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "store": state.relay.store_id(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    match state.relay.check_store().await {
        Ok(()) => HttpResponse::Ok().json(body),
        Err(err) => {
            warn!("Store health check failed: {}", err);
            body["status"] = "unhealthy".into();
            body["error"] = err.to_string().into();
            HttpResponse::ServiceUnavailable().json(body)
        }
    }
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!("Rejected request body: {}", err);
    RelayError::InvalidArguments(err.to_string()).into()
}

fn rejected(err: RelayError) -> RelayError {
    warn!("Request rejected: {}", err);
    err
}

fn failed(err: RelayError) -> RelayError {
    error!("Relay operation failed: {}", err);
    err
}
