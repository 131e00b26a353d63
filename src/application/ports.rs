use async_trait::async_trait;
use image::{DynamicImage, RgbImage};

use crate::domain::{
    dataset::ImageId,
    detection::DetectionResult,
    errors::DomainResult,
    model::ModelConfig,
};

/// Sesión de inferencia del detector one-shot.
#[async_trait]
pub trait DetectorPort: Send + Sync {
    fn config(&self) -> &ModelConfig;
    async fn detect(&self, target: RgbImage, image: RgbImage) -> DomainResult<DetectionResult>;
}

/// Acceso al índice del dataset y a sus imágenes.
#[async_trait]
pub trait ExemplarCatalogPort: Send + Sync {
    fn active_classes(&self) -> &[u32];
    async fn sample_image(&self, category: u32) -> DomainResult<ImageId>;
    async fn load_image(&self, image_id: ImageId) -> DomainResult<RgbImage>;
    /// Recorta y redimensiona un ejemplar de la categoría según la configuración.
    async fn sample_target(&self, category: u32, config: &ModelConfig) -> DomainResult<RgbImage>;
}

/// Lectura de las imágenes subidas, ya presentes en disco.
#[async_trait]
pub trait UploadStorePort: Send + Sync {
    async fn read_upload(&self, file_name: &str) -> DomainResult<DynamicImage>;
}
