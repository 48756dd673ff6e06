use application::ApplicationError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::RepositoryError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
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
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn internal_server_error() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "internal server error",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.body.code
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use ApplicationError as AppErr;

        match error {
            AppErr::InvalidCredential => ApiError::unauthorized(error.to_string()),
            AppErr::InvalidCredentials => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                error.to_string(),
            ),
            AppErr::NotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", error.to_string())
            }
            AppErr::EmailAlreadyExists => {
                ApiError::new(StatusCode::CONFLICT, "EMAIL_EXISTS", error.to_string())
            }
            AppErr::Forbidden => {
                ApiError::new(StatusCode::FORBIDDEN, "FORBIDDEN", error.to_string())
            }
            AppErr::Validation(err) => {
                ApiError::new(StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", err.to_string())
            }
            AppErr::Storage(RepositoryError::NotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "requested resource not found",
            ),
            AppErr::Storage(RepositoryError::Conflict) => {
                ApiError::new(StatusCode::CONFLICT, "CONFLICT", "resource already exists")
            }
            AppErr::Storage(RepositoryError::Timeout) => {
                tracing::error!("storage timed out");
                ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "DEADLINE_EXCEEDED",
                    "storage timed out",
                )
            }
            AppErr::Storage(err) => {
                tracing::error!(error = %err, "storage failure");
                ApiError::internal_server_error()
            }
            AppErr::Password(err) => {
                tracing::error!(error = %err, "password hasher failure");
                ApiError::internal_server_error()
            }
            AppErr::Internal(message) => {
                tracing::error!(error = %message, "internal failure");
                ApiError::internal_server_error()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use domain::DomainError;

    use super::*;

    #[test]
    fn maps_application_errors_to_statuses() {
        let cases = [
            (ApplicationError::InvalidCredential, StatusCode::UNAUTHORIZED),
            (ApplicationError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ApplicationError::NotFound("user"), StatusCode::NOT_FOUND),
            (ApplicationError::EmailAlreadyExists, StatusCode::CONFLICT),
            (ApplicationError::Forbidden, StatusCode::FORBIDDEN),
            (
                ApplicationError::Validation(DomainError::PastTravelDate),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApplicationError::Storage(RepositoryError::storage("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status(), status);
        }
    }

    #[test]
    fn storage_details_are_not_leaked() {
        let err = ApiError::from(ApplicationError::Storage(RepositoryError::storage(
            "relation users does not exist",
        )));
        assert_eq!(err.body.message, "internal server error");
    }
}
