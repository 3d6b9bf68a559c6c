use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

pub mod csrf;
pub mod graphql;
pub mod health;
pub mod routes;
pub mod urls;

use crate::{infrastructure::config::Config, schema::KakiSchema};

use self::routes::RouteError;

pub fn build_router(config: Arc<Config>, schema: KakiSchema) -> Result<Router, RouteError> {
    let table = urls::urlpatterns(schema, &config.graphql)?;
    let router = table
        .into_router(Arc::new(config.csrf.clone()))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http());

    Ok(match cors_layer(config.as_ref()) {
        Some(cors) => router.layer(cors),
        None => router,
    })
}

pub async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "not_found"})),
    )
}

fn cors_layer(config: &Config) -> Option<CorsLayer> {
    if config.app.cors_origins.is_empty() {
        return None;
    }

    let origins: Vec<HeaderValue> = config
        .app
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%origin, error = %err, "ignoring invalid cors origin");
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    )
}
