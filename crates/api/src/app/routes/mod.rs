use axum::Router;

use crate::middleware;

pub mod ledger;
pub mod sensors;
pub mod system;

/// Router for the ledger and the sensor relay.
///
/// Mutating ledger routes are attributed to the `X-Caller-Address` caller; the relay
/// accepts readings from any device.
pub fn router() -> Router {
    Router::new()
        .nest(
            "/ledger",
            ledger::router().layer(axum::middleware::from_fn(middleware::caller_middleware)),
        )
        .nest("/api", sensors::router())
}
