use anyhow::{Context, Result};
use async_trait::async_trait;
use image::{imageops, RgbImage};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::adapters::fs::read_image;
use crate::application::ports::ExemplarCatalogPort;
use crate::domain::{
    dataset::{BBox, CocoDocument, DatasetIndex, ImageId},
    errors::{DomainError, DomainResult},
    imaging::{drop_alpha, resize_image, ResizeParams},
    model::ModelConfig,
};

/// Dataset COCO indexado en memoria. Se carga una vez al arrancar;
/// después solo se lee.
pub struct CocoCatalog {
    index: DatasetIndex,
    image_dir: PathBuf,
}

impl CocoCatalog {
    /// Carga `<root>/annotations/instances_<subset><year>.json`; las imágenes
    /// se buscan en `<root>/<subset><year>/`.
    pub fn load(root: &Path, subset: &str, year: &str) -> Result<Self> {
        let ann_path = root
            .join("annotations")
            .join(format!("instances_{}{}.json", subset, year));
        let file = File::open(&ann_path)
            .with_context(|| format!("abriendo anotaciones {}", ann_path.display()))?;
        let doc: CocoDocument = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("anotaciones COCO mal formadas en {}", ann_path.display()))?;

        let index = DatasetIndex::from_coco(doc)?;
        info!(
            "📚 Dataset COCO {}{}: {} imágenes, {} clases, {} clases one-shot activas",
            subset,
            year,
            index.num_images(),
            index.num_classes() - 1,
            index.active_classes().len()
        );

        Ok(Self {
            index,
            image_dir: root.join(format!("{}{}", subset, year)),
        })
    }

    fn image_path(&self, image_id: ImageId) -> DomainResult<PathBuf> {
        self.index
            .image(image_id)
            .map(|rec| self.image_dir.join(&rec.file_name))
            .ok_or_else(|| DomainError::NotFound(format!("imagen {} no indexada", image_id)))
    }
}

#[async_trait]
impl ExemplarCatalogPort for CocoCatalog {
    fn active_classes(&self) -> &[u32] {
        self.index.active_classes()
    }

    async fn sample_image(&self, category: u32) -> DomainResult<ImageId> {
        self.index.sample_image(category, &mut rand::rng())
    }

    async fn load_image(&self, image_id: ImageId) -> DomainResult<RgbImage> {
        let path = self.image_path(image_id)?;
        tokio::task::spawn_blocking(move || read_image(&path).map(drop_alpha))
            .await
            .map_err(|e| DomainError::OperationFailed(format!("tarea de lectura: {}", e)))?
    }

    async fn sample_target(&self, category: u32, config: &ModelConfig) -> DomainResult<RgbImage> {
        let (path, bbox) = {
            let (rec, bbox) = self.index.sample_instance(category, &mut rand::rng())?;
            (self.image_dir.join(&rec.file_name), bbox)
        };
        debug!(
            "Target '{}' de {} ({}x{})",
            self.index.class_name(category).unwrap_or("?"),
            path.display(),
            bbox.width(),
            bbox.height()
        );
        let params = config.target_resize();
        tokio::task::spawn_blocking(move || {
            let image = drop_alpha(read_image(&path)?);
            crop_target(&image, bbox, &params)
        })
        .await
        .map_err(|e| DomainError::OperationFailed(format!("tarea de recorte: {}", e)))?
    }
}

/// Recorta la instancia y la lleva al tamaño de target del modelo.
fn crop_target(image: &RgbImage, bbox: BBox, params: &ResizeParams) -> DomainResult<RgbImage> {
    let (w, h) = image.dimensions();
    let (y2, x2) = (bbox.y2.min(h), bbox.x2.min(w));
    if y2 <= bbox.y1 || x2 <= bbox.x1 {
        return Err(DomainError::OperationFailed(format!(
            "caja {:?} fuera de una imagen {}x{}",
            bbox, w, h
        )));
    }
    let crop = imageops::crop_imm(image, bbox.x1, bbox.y1, x2 - bbox.x1, y2 - bbox.y1).to_image();
    Ok(resize_image(&crop, params, &mut rand::rng())?.image)
}
