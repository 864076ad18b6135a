//! IoT relay endpoints. Responses keep the relay's camelCase shape with a `success`
//! flag, since field devices and the dashboard read them as-is.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Serialize;

use agrichain_core::ProductId;
use agrichain_infra::SensorStore;
use agrichain_sensors::NewReading;

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/sensor-data", post(record_reading))
        .route("/product/:product_id/environmental", get(product_environmental))
        .route("/device/:device_id", get(get_device))
        .route("/devices", get(list_devices))
        .route("/environmental-overview", get(environmental_overview))
        .route("/statistics", get(statistics))
        .route("/health", get(health))
}

/// Serialize `body` and mark it successful.
fn success<T: Serialize>(body: &T) -> Response {
    let mut value = match serde_json::to_value(body) {
        Ok(v) => v,
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "serialize_error",
                e.to_string(),
            );
        }
    };
    if let Some(map) = value.as_object_mut() {
        map.insert("success".to_string(), serde_json::Value::Bool(true));
    }
    (StatusCode::OK, Json(value)).into_response()
}

pub async fn record_reading(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewReading>,
) -> Response {
    match services.sensors().record(body) {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message": "Sensor data received and stored successfully",
                "deviceId": outcome.reading.device_id,
                "productId": outcome.reading.product_id,
                "timestamp": outcome.reading.timestamp,
                "readingsStored": outcome.readings_stored,
            })),
        )
            .into_response(),
        Err(e) => errors::sensor_error_to_response(e),
    }
}

pub async fn product_environmental(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
) -> Response {
    let product_id: ProductId = match product_id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.sensors().product_environmental(product_id) {
        Ok(summary) => success(&summary),
        Err(e) => errors::sensor_error_to_response(e),
    }
}

pub async fn get_device(
    Extension(services): Extension<Arc<AppServices>>,
    Path(device_id): Path<String>,
) -> Response {
    match services.sensors().device(&device_id) {
        Ok(view) => success(&view),
        Err(e) => errors::sensor_error_to_response(e),
    }
}

pub async fn list_devices(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.sensors().devices() {
        Ok(list) => success(&list),
        Err(e) => errors::sensor_error_to_response(e),
    }
}

pub async fn environmental_overview(
    Extension(services): Extension<Arc<AppServices>>,
) -> Response {
    match services.sensors().environmental_overview() {
        Ok(overview) => success(&overview),
        Err(e) => errors::sensor_error_to_response(e),
    }
}

pub async fn statistics(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.sensors().statistics() {
        Ok(stats) => success(&serde_json::json!({ "statistics": stats })),
        Err(e) => errors::sensor_error_to_response(e),
    }
}

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let ledger_head = match services.ledger().head() {
        Ok(head) => head,
        Err(e) => return errors::ledger_error_to_response(e),
    };
    success(&serde_json::json!({
        "status": "online",
        "timestamp": Utc::now(),
        "ledgerHead": ledger_head,
    }))
}
