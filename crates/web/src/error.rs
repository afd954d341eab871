use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use evaluator::EvaluatorError;
use serde_json::json;
use std::fmt;
use storage::error::StorageError;
use validator::ValidationErrors;

/// Web layer errors
#[derive(Debug)]
pub enum WebError {
    Evaluator(EvaluatorError),
    Validation(ValidationErrors),
    NotFound,
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evaluator(e) => write!(f, "Evaluation error: {}", e),
            Self::Validation(e) => write!(f, "Validation error: {}", e),
            Self::NotFound => write!(f, "Resource not found"),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            Self::Evaluator(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Evaluator(EvaluatorError::EvaluationAlreadyInProgress(_)) => StatusCode::CONFLICT,
            Self::Evaluator(EvaluatorError::StorageError(StorageError::ConstraintViolation(_))) => {
                StatusCode::CONFLICT
            }
            Self::Evaluator(EvaluatorError::InsufficientSubmissions { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::Evaluator(EvaluatorError::ValidationError(_)) => StatusCode::BAD_REQUEST,
            Self::Evaluator(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
        };

        let body = match &self {
            Self::Evaluator(e) if e.is_not_found() => {
                json!({
                    "error": "Resource not found"
                })
            }
            Self::Evaluator(
                e @ (EvaluatorError::EvaluationAlreadyInProgress(_)
                | EvaluatorError::InsufficientSubmissions { .. }
                | EvaluatorError::ValidationError(_)),
            ) => {
                json!({
                    "error": e.to_string()
                })
            }
            Self::Evaluator(EvaluatorError::StorageError(StorageError::ConstraintViolation(msg))) => {
                json!({
                    "error": msg
                })
            }
            Self::Evaluator(e) => {
                tracing::error!("Evaluation error: {:?}", e);
                json!({
                    "error": "An internal error occurred"
                })
            }
            Self::Validation(errors) => {
                let field_errors: Vec<String> = errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, errors)| {
                        errors.iter().map(move |e| {
                            format!(
                                "{}: {}",
                                field,
                                e.message
                                    .as_ref()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| e.code.to_string())
                            )
                        })
                    })
                    .collect();

                json!({
                    "error": "Validation failed",
                    "details": field_errors
                })
            }
            Self::NotFound => {
                json!({
                    "error": "Resource not found"
                })
            }
        };

        (status_code, Json(body)).into_response()
    }
}

impl From<EvaluatorError> for WebError {
    fn from(error: EvaluatorError) -> Self {
        Self::Evaluator(error)
    }
}

impl From<ValidationErrors> for WebError {
    fn from(error: ValidationErrors) -> Self {
        Self::Validation(error)
    }
}
