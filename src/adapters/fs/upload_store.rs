use async_trait::async_trait;
use image::DynamicImage;
use std::path::PathBuf;

use crate::adapters::fs::read_image;
use crate::application::ports::UploadStorePort;
use crate::domain::errors::{DomainError, DomainResult};

/// Lee las imágenes "subidas" desde el directorio de datos de prueba.
/// La subida en sí no se guarda: se busca un fichero con el mismo nombre.
pub struct FsUploadStore {
    root: PathBuf,
}

impl FsUploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl UploadStorePort for FsUploadStore {
    async fn read_upload(&self, file_name: &str) -> DomainResult<DynamicImage> {
        let path = self.root.join(file_name);
        tokio::task::spawn_blocking(move || read_image(&path))
            .await
            .map_err(|e| DomainError::OperationFailed(format!("tarea de lectura: {}", e)))?
    }
}
