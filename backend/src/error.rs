//! Error handling for the inventory platform
//!
//! Provides consistent error responses in English and Spanish

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::StockRuleError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
        message_es: String,
    },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Stock errors
    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        warehouse_id: i64,
        available: i64,
        requested: i64,
    },

    #[error("Integrity conflict: {0}")]
    IntegrityConflict(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &str, message: &str, message_es: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_es: message_es.to_string(),
        }
    }

    /// Translate a pure stock rule failure for the given stock level
    pub fn from_rule(err: StockRuleError, product_id: i64, warehouse_id: i64) -> Self {
        match err {
            StockRuleError::InsufficientStock {
                available,
                requested,
            } => AppError::InsufficientStock {
                product_id,
                warehouse_id,
                available,
                requested,
            },
            other => AppError::InvalidArgument(other.to_string()),
        }
    }
}

/// Classify driver errors so lock conflicts and constraint violations reach
/// callers as typed failures instead of generic database errors.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => {
                    let constraint = db_err.constraint().unwrap_or("unique constraint");
                    return AppError::IntegrityConflict(format!("duplicate value violates {}", constraint));
                }
                // serialization_failure, deadlock_detected, lock_not_available
                Some("40001") | Some("40P01") | Some("55P03") => {
                    return AppError::IntegrityConflict(format!("concurrent update conflict: {}", db_err.message()));
                }
                // numeric_value_out_of_range
                Some("22003") => {
                    return AppError::InvalidArgument(format!("quantity out of range: {}", db_err.message()));
                }
                // check_violation
                Some("23514") => {
                    return AppError::InvalidArgument(format!("check constraint violated: {}", db_err.message()));
                }
                _ => {}
            }
        }
        AppError::DatabaseError(err)
    }
}

/// Reports the first failing field of a request body
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<_> = field_errors.iter().collect();
        fields.sort_by_key(|(field, _)| **field);

        match fields.first() {
            Some((field, errs)) => {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                AppError::Validation {
                    field: field.to_string(),
                    message,
                    message_es: format!("Valor inválido para {}", field),
                }
            }
            None => AppError::validation("request", "Invalid request", "Solicitud inválida"),
        }
    }
}

impl From<StockRuleError> for AppError {
    fn from(err: StockRuleError) -> Self {
        AppError::InvalidArgument(err.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: &str, message_en: impl Into<String>, message_es: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message_en: message_en.into(),
            message_es: message_es.into(),
            field: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("TOKEN_EXPIRED", "Token has expired", "El token ha expirado"),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_TOKEN", "Invalid token", "Token inválido"),
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new(
                    "INSUFFICIENT_PERMISSIONS",
                    "You do not have permission to perform this action",
                    "No tienes permisos para realizar esta acción",
                ),
            ),
            AppError::Unauthorized { message, message_es } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone(), message_es.clone()),
            ),
            AppError::Validation {
                field,
                message,
                message_es,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    field: Some(field.clone()),
                    ..ErrorDetail::new("VALIDATION_ERROR", message.clone(), message_es.clone())
                },
            ),
            AppError::InvalidArgument(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new(
                    "INVALID_ARGUMENT",
                    msg.clone(),
                    format!("Solicitud inválida: {}", msg),
                ),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new(
                    "NOT_FOUND",
                    format!("{} not found", resource),
                    format!("{} no encontrado", resource),
                ),
            ),
            AppError::InsufficientStock {
                available,
                requested,
                ..
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "INSUFFICIENT_STOCK",
                    format!(
                        "Insufficient stock. Available: {}, requested: {}",
                        available, requested
                    ),
                    format!(
                        "Stock insuficiente. Stock actual: {}, solicitado: {}",
                        available, requested
                    ),
                ),
            ),
            AppError::IntegrityConflict(msg) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "INTEGRITY_CONFLICT",
                    msg.clone(),
                    format!("Conflicto de integridad: {}", msg),
                ),
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "CONFIGURATION_ERROR",
                    format!("Configuration error: {}", msg),
                    format!("Error de configuración: {}", msg),
                ),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "DATABASE_ERROR",
                    "A database error occurred",
                    "Ocurrió un error en la base de datos",
                ),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone(), "Error interno del servidor"),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "INTERNAL_ERROR",
                    "An internal server error occurred",
                    "Error interno del servidor",
                ),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for services and handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_errors_map_to_typed_failures() {
        let err = AppError::from_rule(
            StockRuleError::InsufficientStock {
                available: 6,
                requested: 10,
            },
            1,
            2,
        );
        assert!(matches!(
            err,
            AppError::InsufficientStock {
                product_id: 1,
                warehouse_id: 2,
                available: 6,
                requested: 10
            }
        ));

        let err = AppError::from_rule(StockRuleError::NonPositiveQuantity(0), 1, 2);
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("Product".into()), StatusCode::NOT_FOUND),
            (AppError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (AppError::IntegrityConflict("x".into()), StatusCode::CONFLICT),
            (AppError::InsufficientPermissions, StatusCode::FORBIDDEN),
            (
                AppError::InsufficientStock {
                    product_id: 1,
                    warehouse_id: 1,
                    available: 0,
                    requested: 1,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
