use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The blocking thread pool dropped the task.
    #[error("Internal error: {0}")]
    Blocking(String),
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        AppError::Blocking(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        let AppError::Domain(e) = self else {
            return StatusCode::INTERNAL_SERVER_ERROR;
        };
        match e {
            DomainError::NotFound(_) | DomainError::TokenNotFound => StatusCode::NOT_FOUND,
            DomainError::DuplicateAssignment { .. }
            | DomainError::ItemAlreadyAssigned(_)
            | DomainError::AlreadyResponded
            | DomainError::InvalidTransition { .. } => StatusCode::CONFLICT,
            DomainError::TokenExpired => StatusCode::GONE,
            DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DomainError::ConnectorUnavailable { retryable: true, .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            DomainError::ConnectorUnavailable { retryable: false, .. } => StatusCode::BAD_GATEWAY,
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Storage and driver details stay in the log.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("{}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(serde_json::json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;
    use uuid::Uuid;

    fn status_of(e: DomainError) -> StatusCode {
        AppError::from(e).error_response().status()
    }

    #[test]
    fn missing_entities_return_404() {
        assert_eq!(status_of(DomainError::not_found("Order", Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(DomainError::TokenNotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflicts_return_409() {
        let conflicts = [
            DomainError::DuplicateAssignment {
                order_id: Uuid::nil(),
                vendor_id: Uuid::nil(),
            },
            DomainError::ItemAlreadyAssigned(Uuid::nil()),
            DomainError::AlreadyResponded,
            DomainError::invalid_transition("completed", "accepted"),
        ];
        for e in conflicts {
            assert_eq!(status_of(e), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn expired_token_returns_410() {
        assert_eq!(status_of(DomainError::TokenExpired), StatusCode::GONE);
    }

    #[test]
    fn invalid_input_returns_400() {
        assert_eq!(
            status_of(DomainError::InvalidInput("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn connector_status_depends_on_retryability() {
        let unavailable = |retryable| DomainError::ConnectorUnavailable {
            message: "timeout".to_string(),
            retryable,
        };
        assert_eq!(status_of(unavailable(true)), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_of(unavailable(false)), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internal_error_returns_500() {
        let err = AppError::from(DomainError::Internal("connection refused".to_string()));
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn domain_message_passes_through() {
        assert_eq!(
            AppError::from(DomainError::TokenExpired).to_string(),
            "Approval token has expired"
        );
    }
}
