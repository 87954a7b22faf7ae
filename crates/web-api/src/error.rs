use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
                retryable: false,
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn status_for(error: &ApplicationError) -> StatusCode {
    match error {
        ApplicationError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
        ApplicationError::MalformedRequest(_) | ApplicationError::Validation(_) => {
            StatusCode::BAD_REQUEST
        }
        ApplicationError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        ApplicationError::SessionNotFound | ApplicationError::QuestionNotFound => {
            StatusCode::NOT_FOUND
        }
        ApplicationError::SubmissionsDisabled => StatusCode::FORBIDDEN,
        ApplicationError::Transient { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ApplicationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        Self {
            status: status_for(&error),
            body: ErrorBody {
                code: error.code(),
                message: error.public_message(),
                retryable: error.is_retryable(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use application::ValidationError;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        let cases = [
            (ApplicationError::AuthenticationRequired, StatusCode::UNAUTHORIZED),
            (ApplicationError::malformed("bad"), StatusCode::BAD_REQUEST),
            (
                ApplicationError::Validation(ValidationError::ContentRequired),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApplicationError::RateLimited {
                    limit: 10,
                    window_seconds: 60,
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (ApplicationError::SessionNotFound, StatusCode::NOT_FOUND),
            (ApplicationError::SubmissionsDisabled, StatusCode::FORBIDDEN),
            (ApplicationError::QuestionNotFound, StatusCode::NOT_FOUND),
            (
                ApplicationError::transient("persist", "timed out"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApplicationError::internal("relation \"questions\" does not exist"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status(), status);
        }
    }

    #[test]
    fn internal_detail_does_not_leak() {
        let api = ApiError::from(ApplicationError::internal("relation \"questions\" does not exist"));
        assert!(!api.body.message.contains("relation"));
        assert_eq!(api.body.code, "INTERNAL_ERROR");
        assert!(!api.body.retryable);
    }
}
