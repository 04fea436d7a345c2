use crate::models::{AnalysisRecord, ParlayAnalysisRequest, ParlayAnalysisResult};
use crate::scrapers::slip_parser;
use crate::utils::store::{StoreError, HISTORY_LIMIT};
use crate::{analyze_and_record, AppState};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tracing::{error, warn};

// Phone screenshots routinely exceed axum's 2 MB default
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Errors surfaced to API callers as `{ "detail": ... }`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(message) = &self {
            error!(%message, "Request failed");
        }
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(format!("Failed to store analysis: {}", err))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid upload: {}", err.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(format!("Invalid upload: {}", rejection.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// CORS for the browser frontend at `origin`
pub fn cors_layer(origin: &str) -> Result<CorsLayer, ApiError> {
    let origin = HeaderValue::from_str(origin)
        .map_err(|e| ApiError::Internal(format!("Invalid CORS origin '{}': {}", origin, e)))?;

    // Credentials rule out wildcards, so methods and headers mirror the request
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

pub fn router(state: AppState) -> Router {
    let bets = Router::new()
        .route("/analyze", post(analyze))
        .route("/analyze-image", post(analyze_image))
        .route("/history/:wallet_address", get(history));

    Router::new()
        .route("/", get(root))
        .nest("/api/v1/bets", bets)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Parlay Pulse API is running!" }))
}

fn require_wallet(wallet_address: &str) -> Result<(), ApiError> {
    if wallet_address.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "wallet_address must not be empty".to_string(),
        ));
    }
    Ok(())
}

async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<ParlayAnalysisRequest>, JsonRejection>,
) -> Result<Json<ParlayAnalysisResult>, ApiError> {
    let Json(request) = payload?;
    require_wallet(&request.wallet_address)?;

    let result = analyze_and_record(&state, request).await?;
    Ok(Json(result))
}

async fn analyze_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ParlayAnalysisResult>, ApiError> {
    let mut multipart = multipart?;
    let mut image = None;
    let mut wallet_address = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") | Some("image") => image = Some(field.bytes().await?),
            Some("wallet_address") => wallet_address = Some(field.text().await?),
            _ => {}
        }
    }

    let image =
        image.ok_or_else(|| ApiError::BadRequest("Missing image upload field 'file'".to_string()))?;
    let wallet_address = wallet_address
        .ok_or_else(|| ApiError::BadRequest("Missing field 'wallet_address'".to_string()))?;
    require_wallet(&wallet_address)?;

    let text = state
        .ocr
        .recognize(&image)
        .await
        .map_err(|e| ApiError::Unprocessable(format!("Could not read slip image: {}", e)))?;

    let slip = slip_parser::parse_detailed(&text);
    for flag in &slip.flags {
        warn!(?flag, "Questionable leg pairing in slip");
    }
    // An empty slip is a valid parse, but scoring it would record a useless
    // fallback; 422 tells the client to retry with a better image
    if slip.parlay.individual_bets.is_empty() {
        return Err(ApiError::Unprocessable(
            "No bets recognized in slip image; try a clearer screenshot".to_string(),
        ));
    }

    let request = ParlayAnalysisRequest {
        parlay: slip.parlay,
        wallet_address,
    };
    let result = analyze_and_record(&state, request).await?;
    Ok(Json(result))
}

async fn history(
    State(state): State<AppState>,
    Path(wallet_address): Path<String>,
) -> Result<Json<Vec<AnalysisRecord>>, ApiError> {
    let records = state
        .store
        .find_by_wallet(&wallet_address, HISTORY_LIMIT)
        .await?;
    Ok(Json(records))
}
