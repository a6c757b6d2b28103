use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::services::{GatewayError, ServiceError};
use crate::store::StoreError;

/// Error body returned by every handler.
#[derive(Debug, Serialize)]
pub struct ApiError {
    success: bool,
    message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("credenciales inválidas")]
    Unauthorized,
    #[error("acceso restringido a administradores")]
    Forbidden,
    #[error("{0}")]
    Conflict(String),
    /// The payment gateway failed or refused; detail is logged only.
    #[error("payment gateway error: {0}")]
    Upstream(String),
    /// Anything the caller cannot fix; detail is logged only.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Upstream(_) => {
                "Error en la pasarela de pago. Intentá nuevamente más tarde.".to_string()
            }
            AppError::Internal(_) => "Error interno del servidor".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        }
        let body = ApiError {
            success: false,
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::EventNotFound => AppError::NotFound("Evento no encontrado".to_string()),
            ServiceError::BookingNotFound => AppError::NotFound("Reserva no encontrada".to_string()),
            ServiceError::InvalidParticipants(n) => {
                AppError::BadRequest(format!("participants_count debe ser al menos 1 (recibido {})", n))
            }
            ServiceError::IncompleteRedirect => {
                AppError::BadRequest("Información de pago incompleta".to_string())
            }
            ServiceError::NotPayable => {
                AppError::Conflict("La reserva no tiene un pago pendiente".to_string())
            }
            ServiceError::InvalidPaymentId(_) => {
                AppError::BadRequest("Identificador de pago inválido".to_string())
            }
            ServiceError::Store(e) => e.into(),
            ServiceError::Gateway(e) => e.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Registro no encontrado".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict("El registro ya existe".to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(format!("Datos inválidos: {}", err))
    }
}
