//! HTTP surface of the gateway.
//!
//! ## Endpoints
//!
//! - `GET /health` - liveness plus whether a model is loaded (never limited)
//! - `POST /predict` - one prediction, limited by `RATELIMIT_PREDICT`
//! - `GET /` - service metadata, limited by `RATELIMIT_DEFAULT`
//!
//! Every route is also served under `/api`, where earlier clients expect it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::common::config::AppCfg;
use crate::common::error::GatewayError;
use crate::common::log::log_failure;
use crate::common::quota::Quota;
use crate::common::time;
use crate::inference::domain::ValidationFailure;
use crate::inference::service::Gateway;

use super::ratelimit::RateLimiter;

pub const SERVICE_NAME: &str = "Foresee Cycles ML API";

const INTERNAL_ERROR: &str = "An internal server error occurred";

/// Quotas applied per route family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteLimits {
    pub default: Vec<Quota>,
    pub predict: Vec<Quota>,
}

impl RouteLimits {
    pub fn from_cfg(cfg: &AppCfg) -> Self {
        Self {
            default: cfg.ratelimit_default.clone(),
            predict: cfg.ratelimit_predict.clone(),
        }
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    gateway: Gateway,
    limiter: Arc<RateLimiter>,
    limits: Arc<RouteLimits>,
}

impl AppState {
    pub fn new(gateway: Gateway, limits: RouteLimits) -> Self {
        Self {
            gateway,
            limiter: Arc::new(RateLimiter::new()),
            limits: Arc::new(limits),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    model_loaded: bool,
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    prediction: i64,
    confidence: f64,
}

#[derive(Debug, Serialize)]
struct ModelSummary {
    name: String,
    version: String,
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct IndexResponse {
    service: &'static str,
    version: &'static str,
    model: Option<ModelSummary>,
    endpoints: Value,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Validation(failure) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": failure.as_map() })))
                    .into_response()
            }
            GatewayError::ModelMissing => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "ML model not available" })),
            )
                .into_response(),
            GatewayError::RateLimited {
                limit,
                retry_after_secs,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                Json(json!({ "error": format!("Rate limit exceeded: {limit}") })),
            )
                .into_response(),
            GatewayError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": INTERNAL_ERROR })),
            )
                .into_response(),
        }
    }
}

fn routes(state: &AppState) -> Router<AppState> {
    let predict_routes = Router::new()
        .route("/predict", post(predict))
        .route_layer(middleware::from_fn_with_state(state.clone(), limit_predict));
    let index_routes = Router::new()
        .route("/", get(index))
        .route_layer(middleware::from_fn_with_state(state.clone(), limit_default));

    Router::new()
        .route("/health", get(health))
        .merge(predict_routes)
        .merge(index_routes)
}

/// Build the router without transport concerns such as CORS.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes(&state))
        .nest("/api", routes(&state))
        .fallback(not_found)
        .with_state(state)
}

/// Full application: router plus CORS configured from `cfg`.
pub fn build_app(state: AppState, cfg: &AppCfg) -> Router {
    create_router(state).layer(cors_layer(cfg))
}

pub fn cors_layer(cfg: &AppCfg) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if cfg.cors_allows_any() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = cfg
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

fn client_key(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn enforce(
    state: &AppState,
    scope: &'static str,
    quotas: &[Quota],
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let client = client_key(&req);
    match state.limiter.check(scope, &client, quotas) {
        Ok(()) => next.run(req).await,
        Err(rejection) => {
            log::info!(
                "Rate limit {} exceeded on {scope} by {client}",
                rejection.quota
            );
            let retry = rejection.retry_after;
            let retry_after_secs = (retry.as_secs() + u64::from(retry.subsec_nanos() > 0)).max(1);
            let err = GatewayError::RateLimited {
                limit: rejection.quota.to_string(),
                retry_after_secs,
            };
            log_failure("http", "rate_limited", &err, start.elapsed());
            err.into_response()
        }
    }
}

async fn limit_predict(State(state): State<AppState>, req: Request, next: Next) -> Response {
    enforce(&state, "predict", &state.limits.predict, req, next).await
}

async fn limit_default(State(state): State<AppState>, req: Request, next: Next) -> Response {
    enforce(&state, "default", &state.limits.default, req, next).await
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let report = state.gateway.health();
    Json(HealthResponse {
        status: report.status,
        timestamp: time::now_iso(),
        model_loaded: report.model_loaded,
    })
}

async fn predict(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, GatewayError> {
    let start = Instant::now();
    // Availability is decided before the body is even looked at.
    if !state.gateway.model_loaded() {
        let err = GatewayError::ModelMissing;
        log_failure("http", "predict_failed", &err, start.elapsed());
        return Err(err);
    }
    let Json(payload) = body.map_err(|rejection| {
        let err = GatewayError::from(ValidationFailure::schema(rejection.body_text()));
        log_failure("http", "predict_failed", &err, start.elapsed());
        err
    })?;

    let prediction = state.gateway.predict(&payload)?;
    Ok(Json(PredictResponse {
        prediction: prediction.label,
        confidence: prediction.confidence,
    }))
}

async fn index(State(state): State<AppState>) -> Json<IndexResponse> {
    let model = state.gateway.model_info().map(|info| ModelSummary {
        name: info.name.clone(),
        version: info.version.clone(),
        kind: info.kind.as_str(),
    });
    Json(IndexResponse {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        model,
        endpoints: json!({
            "health": "GET /health",
            "predict": "POST /predict",
        }),
    })
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
        .into_response()
}
