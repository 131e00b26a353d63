pub mod upload_store;

use image::DynamicImage;
use std::io::ErrorKind;
use std::path::Path;

use crate::domain::errors::{DomainError, DomainResult};

/// Abre y decodifica una imagen de disco distinguiendo "no existe" de "no se pudo leer".
pub fn read_image(path: &Path) -> DomainResult<DynamicImage> {
    image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) if io.kind() == ErrorKind::NotFound => {
            DomainError::NotFound(format!("fichero no encontrado: {}", path.display()))
        }
        other => DomainError::OperationFailed(format!(
            "no se pudo decodificar {}: {}",
            path.display(),
            other
        )),
    })
}
