use axum::{
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::Response,
};

use agrichain_core::Address;

use crate::app::errors::json_error;
use crate::context::CallerContext;

pub const CALLER_HEADER: &str = "x-caller-address";

/// Attach the caller identity to mutating requests.
///
/// Reads pass through untouched. Anything else must carry a well-formed
/// `X-Caller-Address`.
pub async fn caller_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    if is_read(req.method()) {
        return Ok(next.run(req).await);
    }

    let caller = extract_caller(req.headers())?;
    req.extensions_mut().insert(CallerContext::new(caller));

    Ok(next.run(req).await)
}

fn is_read(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn extract_caller(headers: &HeaderMap) -> Result<Address, Response> {
    let header = headers.get(CALLER_HEADER).ok_or_else(|| {
        json_error(
            StatusCode::UNAUTHORIZED,
            "missing_caller",
            "X-Caller-Address header is required",
        )
    })?;

    let raw = header.to_str().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_address",
            "X-Caller-Address is not valid text",
        )
    })?;

    raw.parse::<Address>()
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, e.code(), e.to_string()))
}
