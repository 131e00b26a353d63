use axum::{extract::{Multipart, State}, Json};
use tracing::info;

use crate::adapters::http::{error::ApiError, state::HttpState};
use crate::application::dto::{CategoryRequest, MessageResponse, PredictionResponse};
use crate::domain::errors::DomainError;

pub const BANNER: &str = "PyData Amsterdam Festival rulezzz!!!!!!!!";

/// Campo multipart que trae la imagen.
const UPLOAD_FIELD: &str = "image_file";

pub async fn read_root() -> Json<MessageResponse> {
    Json(MessageResponse { message: BANNER.to_string() })
}

pub async fn predict_by_category(
    State(st): State<HttpState>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let result = st.search.predict_by_category(req.number).await?;
    info!("predict_by_category({}): {} instancias", req.number, result.len());
    Ok(Json(PredictionResponse::from(&result)))
}

pub async fn predict_image(
    State(st): State<HttpState>,
    mut multipart: Multipart,
) -> Result<Json<PredictionResponse>, ApiError> {
    let mut file_name = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DomainError::InvalidInput(format!("multipart inválido: {}", e)))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            file_name = field.file_name().map(str::to_string);
            break;
        }
    }
    let file_name = file_name.ok_or_else(|| {
        DomainError::InvalidInput(format!("falta el fichero en el campo '{}'", UPLOAD_FIELD))
    })?;

    let result = st.search.predict_upload(&file_name).await?;
    info!("predict_image({}): {} instancias", file_name, result.len());
    Ok(Json(PredictionResponse::from(&result)))
}
