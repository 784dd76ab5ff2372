//! ---
//! cfp_section: "05-networking-external-interfaces"
//! cfp_subsection: "module"
//! cfp_type: "source"
//! cfp_scope: "code"
//! cfp_description: "Request validation and HTTP surface for the calculation engine."
//! cfp_version: "v0.1.0"
//! cfp_owner: "tbd"
//! ---
use serde_json::Value;
use thiserror::Error;

use crate::model::{Category, UsageRecord};

#[cfg(feature = "rest-api")]
pub use rest::{router, ApiState, RouterOptions};

/// Rejections raised while validating an inbound usage record.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RequestError {
    #[error("Request body must be JSON")]
    NotJson,
    #[error("Missing required fields in usage")]
    MissingCategories { missing: Vec<Category> },
    #[error("invalid usage at {path}: {message}")]
    InvalidShape { path: String, message: String },
}

/// Checks that all three categories are present and hold name-to-number
/// mappings, then converts the document into a [`UsageRecord`].
pub fn parse_usage(value: Value) -> Result<UsageRecord, RequestError> {
    let missing: Vec<Category> = match value.as_object() {
        Some(object) => Category::ALL
            .into_iter()
            .filter(|category| !object.contains_key(category.key()))
            .collect(),
        None => Category::ALL.to_vec(),
    };
    if !missing.is_empty() {
        return Err(RequestError::MissingCategories { missing });
    }

    serde_path_to_error::deserialize(value).map_err(|err| RequestError::InvalidShape {
        path: err.path().to_string(),
        message: err.inner().to_string(),
    })
}

#[cfg(feature = "rest-api")]
mod rest {
    use std::any::Any;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::extract::rejection::JsonRejection;
    use axum::extract::State;
    use axum::http::{HeaderValue, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde::Serialize;
    use serde_json::Value;
    use tower_http::catch_panic::CatchPanicLayer;
    use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};
    use tower_http::timeout::TimeoutLayer;
    use tower_http::trace::TraceLayer;
    use tracing::{error, warn};

    use super::{parse_usage, RequestError};
    use crate::emissions::{compute_with_policy, AttributionPolicy, EmissionsBreakdown};
    use crate::model::{EmissionFactorsTable, MaterialRatioTable};

    const INTERNAL_ERROR: &str = "An internal server error occurred";

    /// Read-only tables shared by every request.
    #[derive(Debug, Clone)]
    pub struct ApiState {
        factors: Arc<EmissionFactorsTable>,
        ratios: Arc<MaterialRatioTable>,
        policy: AttributionPolicy,
    }

    impl ApiState {
        pub fn new(
            factors: EmissionFactorsTable,
            ratios: MaterialRatioTable,
            policy: AttributionPolicy,
        ) -> Self {
            Self {
                factors: Arc::new(factors),
                ratios: Arc::new(ratios),
                policy,
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct RouterOptions {
        /// Allowed origins; empty allows any origin.
        pub cors_origins: Vec<String>,
        pub request_timeout: Duration,
    }

    impl Default for RouterOptions {
        fn default() -> Self {
            Self {
                cors_origins: Vec::new(),
                request_timeout: Duration::from_secs(30),
            }
        }
    }

    pub fn router(state: ApiState, options: &RouterOptions) -> Router {
        Router::new()
            .route("/calculate_emissions", post(calculate_emissions))
            .route("/health", get(health))
            .with_state(Arc::new(state))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TimeoutLayer::new(options.request_timeout))
            .layer(cors_layer(&options.cors_origins))
            .layer(TraceLayer::new_for_http())
    }

    fn cors_layer(origins: &[String]) -> CorsLayer {
        let layer = CorsLayer::new()
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin);
        if origins.is_empty() {
            return layer.allow_origin(AnyOrigin);
        }
        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(origin = %origin, error = %err, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        layer.allow_origin(AllowOrigin::list(allowed))
    }

    #[derive(Debug, Serialize)]
    struct ErrorResponse {
        error: String,
    }

    #[derive(Debug)]
    struct ApiError {
        status: StatusCode,
        message: String,
    }

    impl ApiError {
        fn internal() -> Self {
            Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: INTERNAL_ERROR.to_owned(),
            }
        }
    }

    impl From<RequestError> for ApiError {
        fn from(err: RequestError) -> Self {
            Self {
                status: StatusCode::BAD_REQUEST,
                message: err.to_string(),
            }
        }
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            let body = Json(ErrorResponse {
                error: self.message,
            });
            (self.status, body).into_response()
        }
    }

    fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
        error!("calculation request panicked");
        ApiError::internal().into_response()
    }

    async fn calculate_emissions(
        State(state): State<Arc<ApiState>>,
        payload: Result<Json<Value>, JsonRejection>,
    ) -> Result<Json<EmissionsBreakdown>, ApiError> {
        let Json(value) = payload.map_err(|rejection| {
            warn!(error = %rejection, "request body rejected");
            ApiError::from(RequestError::NotJson)
        })?;
        let usage = parse_usage(value).map_err(|err| {
            warn!(error = %err, "usage record rejected");
            ApiError::from(err)
        })?;
        let breakdown = compute_with_policy(&usage, &state.factors, &state.ratios, state.policy);
        Ok(Json(breakdown))
    }

    #[derive(Debug, Serialize)]
    struct HealthResponse {
        status: &'static str,
        attribution: AttributionPolicy,
        energy_sources: usize,
        raw_materials: usize,
        intermediate_products: usize,
        ratio_products: usize,
    }

    async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
        Json(HealthResponse {
            status: "ok",
            attribution: state.policy,
            energy_sources: state.factors.energy_sources.len(),
            raw_materials: state.factors.raw_materials.len(),
            intermediate_products: state.factors.intermediate_products.len(),
            ratio_products: state.ratios.products().count(),
        })
    }

    #[cfg(test)]
    mod tests {
        use axum::body::{to_bytes, Body};
        use axum::http::{header, Request};
        use tower::ServiceExt;

        use super::*;
        use crate::model::Category;

        fn app() -> Router {
            let factors = EmissionFactorsTable::default()
                .with_factor(Category::EnergySources, "electricity", 0.5)
                .with_factor(Category::RawMaterials, "steel", 1.9);
            let state = ApiState::new(factors, MaterialRatioTable::new(), AttributionPolicy::Legacy);
            router(state, &RouterOptions::default())
        }

        async fn post_json(body: &str, content_type: Option<&str>) -> (StatusCode, Value) {
            let mut request = Request::post("/calculate_emissions");
            if let Some(content_type) = content_type {
                request = request.header(header::CONTENT_TYPE, content_type);
            }
            let response = app()
                .oneshot(request.body(Body::from(body.to_owned())).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, serde_json::from_slice(&bytes).unwrap())
        }

        #[tokio::test]
        async fn computes_valid_usage() {
            let body = r#"{"energy_sources": {"electricity": 10}, "raw_materials": {"steel": 0}, "intermediate_products": {}}"#;
            let (status, value) = post_json(body, Some("application/json")).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(value["electricity"], 5.0);
            assert_eq!(value["steel"], 0.0);
            assert_eq!(value["total"], 5.0);
        }

        #[tokio::test]
        async fn rejects_missing_category() {
            let body = r#"{"energy_sources": {}, "raw_materials": {}}"#;
            let (status, value) = post_json(body, Some("application/json")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(value["error"], "Missing required fields in usage");
        }

        #[tokio::test]
        async fn rejects_non_json_body() {
            let (status, value) = post_json("electricity=10", Some("text/plain")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(value["error"], "Request body must be JSON");

            let (status, _) = post_json("{not json", Some("application/json")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        #[tokio::test]
        async fn health_reports_table_sizes() {
            let response = app()
                .oneshot(Request::get("/health").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(value["energy_sources"], 1);
            assert_eq!(value["attribution"], "legacy");
        }
    }
}
