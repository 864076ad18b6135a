use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use agrichain_core::{DomainError, ErrorCategory};
use agrichain_infra::{LedgerError, SensorStoreError};

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    if err.is_conflict() {
        return json_error(StatusCode::CONFLICT, "conflict", err.to_string());
    }
    match err {
        LedgerError::Domain(e) => domain_error_to_response(e),
        LedgerError::Journal(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "journal_error", e.to_string())
        }
        LedgerError::Deserialize { .. } => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "deserialize_error",
            err.to_string(),
        ),
        LedgerError::Inconsistent(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "inconsistent_state", msg)
        }
        LedgerError::Poisoned => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "poisoned",
            "ledger unavailable",
        ),
    }
}

pub fn sensor_error_to_response(err: SensorStoreError) -> axum::response::Response {
    match err {
        SensorStoreError::Domain(e) => domain_error_to_response(e),
        SensorStoreError::Poisoned => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "poisoned",
            "sensor store unavailable",
        ),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    json_error(domain_status(&err), err.code(), err.to_string())
}

/// Input that never reached the ledger (unparseable ids, addresses, amounts) is a bad
/// request; everything else follows the error's category.
pub fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::InvalidAddress(_)
        | DomainError::InvalidAmount(_)
        | DomainError::InvalidProductId(_) => StatusCode::BAD_REQUEST,
        _ => match err.category() {
            ErrorCategory::Authorization => StatusCode::FORBIDDEN,
            ErrorCategory::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        },
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrichain_core::ProductId;

    #[test]
    fn categories_map_to_statuses() {
        assert_eq!(domain_status(&DomainError::NotOwner), StatusCode::FORBIDDEN);
        assert_eq!(domain_status(&DomainError::AlreadyRegistered), StatusCode::FORBIDDEN);
        assert_eq!(
            domain_status(&DomainError::InvalidTransition { from: 0, to: 2 }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            domain_status(&DomainError::ProductNotFound(ProductId::new(9))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            domain_status(&DomainError::invalid_address("0x1")),
            StatusCode::BAD_REQUEST
        );
    }
}
