use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stocktrack_core::DomainError;
use stocktrack_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match &err {
        ServiceError::Validation(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
        }
        ServiceError::NotFound { .. } => {
            json_error(StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        ServiceError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", err.to_string()),
        ServiceError::Persistence(_) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "persistence_error",
            err.to_string(),
        ),
        ServiceError::PartialFailure { .. } => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "partial_failure",
            err.to_string(),
        ),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    service_error_to_response(err.into())
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

/// Parse a path segment into a typed id, or answer 400.
pub fn parse_id<T>(raw: &str, what: &'static str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr,
{
    raw.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocktrack_core::ValidationError;
    use stocktrack_infra::GatewayError;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::Validation(ValidationError::EmptyLineList), StatusCode::BAD_REQUEST),
            (ServiceError::not_found("item", "x"), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("in use".into()), StatusCode::CONFLICT),
            (
                ServiceError::Persistence(GatewayError::Storage("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(service_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn bad_ids_are_rejected() {
        let res = parse_id::<stocktrack_core::ItemId>("nope", "item").unwrap_err();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
