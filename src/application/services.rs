use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::{
    application::ports::{DetectorPort, ExemplarCatalogPort, UploadStorePort},
    domain::{
        dataset::NUM_COCO_CLASSES,
        detection::DetectionResult,
        errors::{DomainError, DomainResult},
        imaging::{drop_alpha, resize_image},
        model::ModelConfig,
    },
};

/// Casos de uso de búsqueda visual: adapta peticiones a llamadas `detect(target, imagen)`.
/// Se construye una vez al arrancar y se comparte entre todas las peticiones.
#[derive(Clone)]
pub struct SearchService {
    detector: Arc<dyn DetectorPort>,
    catalog: Arc<dyn ExemplarCatalogPort>,
    uploads: Arc<dyn UploadStorePort>,
}

impl SearchService {
    pub fn new(
        detector: Arc<dyn DetectorPort>,
        catalog: Arc<dyn ExemplarCatalogPort>,
        uploads: Arc<dyn UploadStorePort>,
    ) -> Self {
        Self {
            detector,
            catalog,
            uploads,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        self.detector.config()
    }

    pub fn active_classes(&self) -> &[u32] {
        self.catalog.active_classes()
    }

    /// Busca instancias de la categoría `number` en una imagen del dataset que la contiene.
    /// Fuera de [1, 80] no se toca el modelo.
    pub async fn predict_by_category(&self, number: i64) -> DomainResult<DetectionResult> {
        if !(1..=NUM_COCO_CLASSES as i64).contains(&number) {
            return Err(DomainError::CategoryOutOfRange(number));
        }
        let category = number as u32;

        let image_id = self.catalog.sample_image(category).await?;
        let target = self.catalog.sample_target(category, self.config()).await?;
        let image = self.catalog.load_image(image_id).await?;
        debug!(category, image_id, "predict_by_category: imagen y target elegidos");

        self.detector.detect(target, image).await
    }

    /// Predicción sobre una imagen subida que ya existe en el directorio de pruebas.
    pub async fn predict_upload(&self, file_name: &str) -> DomainResult<DetectionResult> {
        validate_file_name(file_name)?;
        let raw = self.uploads.read_upload(file_name).await?;

        let params = self.config().image_resize();
        let image = tokio::task::spawn_blocking(move || {
            let rgb = drop_alpha(raw);
            resize_image(&rgb, &params, &mut rand::rng()).map(|r| r.image)
        })
        .await
        .map_err(|e| DomainError::OperationFailed(format!("tarea de redimensionado: {}", e)))??;

        // La categoría del target no depende del contenido de la imagen subida.
        let category = rand::rng().random_range(0..NUM_COCO_CLASSES) + 1;
        debug!(file_name, category, "predict_upload: target aleatorio");
        let target = self.catalog.sample_target(category, self.config()).await?;

        self.detector.detect(target, image).await
    }
}

/// Solo se aceptan nombres de fichero planos, sin componentes de ruta.
fn validate_file_name(file_name: &str) -> DomainResult<()> {
    let plain = Path::new(file_name)
        .file_name()
        .map(|n| n == file_name)
        .unwrap_or(false);
    if file_name.is_empty() || !plain || file_name.contains('\\') {
        return Err(DomainError::InvalidInput(format!(
            "nombre de fichero no válido: '{}'",
            file_name
        )));
    }
    Ok(())
}
