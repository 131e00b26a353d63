//! Dobles de prueba para los puertos de la capa de aplicación.

use async_trait::async_trait;
use image::{DynamicImage, RgbImage, Rgba, RgbaImage};
use ndarray::{arr1, arr2, Array3};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::application::ports::{DetectorPort, ExemplarCatalogPort, UploadStorePort};
use crate::application::services::SearchService;
use crate::domain::{
    dataset::{one_shot_classes, ImageId},
    detection::DetectionResult,
    errors::{DomainError, DomainResult},
    model::ModelConfig,
};

pub struct FakeDetector {
    config: ModelConfig,
    pub calls: AtomicUsize,
    /// (ancho, alto) de la última imagen recibida.
    pub last_image: Mutex<Option<(u32, u32)>>,
}

#[async_trait]
impl DetectorPort for FakeDetector {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    async fn detect(&self, _target: RgbImage, image: RgbImage) -> DomainResult<DetectionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_image.lock().unwrap() = Some(image.dimensions());
        let (w, h) = (image.width() as usize, image.height() as usize);
        Ok(DetectionResult {
            rois: arr2(&[[1, 2, 3, 4], [5, 6, 7, 8]]),
            masks: Array3::from_elem((2, h, w), false),
            class_ids: arr1(&[1, 1]),
            scores: arr1(&[0.99, 0.75]),
        })
    }
}

pub struct FakeCatalog {
    active: Vec<u32>,
    /// Categorías para las que se pidió un target.
    pub targets: Mutex<Vec<u32>>,
}

#[async_trait]
impl ExemplarCatalogPort for FakeCatalog {
    fn active_classes(&self) -> &[u32] {
        &self.active
    }

    async fn sample_image(&self, category: u32) -> DomainResult<ImageId> {
        Ok(category as ImageId * 100)
    }

    async fn load_image(&self, _image_id: ImageId) -> DomainResult<RgbImage> {
        Ok(RgbImage::new(16, 12))
    }

    async fn sample_target(&self, category: u32, config: &ModelConfig) -> DomainResult<RgbImage> {
        self.targets.lock().unwrap().push(category);
        Ok(RgbImage::new(config.target_max_dim, config.target_max_dim))
    }
}

#[derive(Default)]
pub struct FakeUploads {
    files: HashMap<String, DynamicImage>,
}

impl FakeUploads {
    pub fn rgba(name: &str, width: u32, height: u32) -> Self {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 128]));
        let mut files = HashMap::new();
        files.insert(name.to_string(), DynamicImage::ImageRgba8(img));
        Self { files }
    }
}

#[async_trait]
impl UploadStorePort for FakeUploads {
    async fn read_upload(&self, file_name: &str) -> DomainResult<DynamicImage> {
        self.files
            .get(file_name)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("fichero no encontrado: {}", file_name)))
    }
}

pub fn fake_service(uploads: FakeUploads) -> (SearchService, Arc<FakeDetector>, Arc<FakeCatalog>) {
    let detector = Arc::new(FakeDetector {
        config: ModelConfig::small(),
        calls: AtomicUsize::new(0),
        last_image: Mutex::new(None),
    });
    let catalog = Arc::new(FakeCatalog {
        active: one_shot_classes(),
        targets: Mutex::new(Vec::new()),
    });
    let svc = SearchService::new(detector.clone(), catalog.clone(), Arc::new(uploads));
    (svc, detector, catalog)
}
