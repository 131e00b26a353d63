use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use tracing::{error, warn};

use crate::domain::errors::{DomainError, CATEGORY_RANGE_MSG};

/// Traduce los errores de dominio a códigos HTTP en el borde del servicio.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            DomainError::CategoryOutOfRange(n) => {
                warn!("Categoría fuera de rango: {}", n);
                (StatusCode::BAD_REQUEST, Json(json!({ "msg": CATEGORY_RANGE_MSG }))).into_response()
            }
            DomainError::InvalidInput(msg) => {
                warn!("Petición rechazada: {}", msg);
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            e @ (DomainError::NotFound(_) | DomainError::OperationFailed(_)) => {
                error!("Error procesando la petición: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response()
            }
        }
    }
}
