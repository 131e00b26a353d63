use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::DomainError;
use crate::domain::imaging::{ResizeMode, ResizeParams};

/// Variante del modelo elegida al arrancar el proceso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Small,
    Large,
}

impl ModelSize {
    /// Checkpoint exportado que corresponde a esta variante.
    pub fn checkpoint_file(self) -> &'static str {
        match self {
            ModelSize::Small => "small_siamese_mrcnn_0160.onnx",
            ModelSize::Large => "large_siamese_mrcnn_0320.onnx",
        }
    }
}

impl FromStr for ModelSize {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(ModelSize::Small),
            "large" => Ok(ModelSize::Large),
            other => Err(DomainError::InvalidInput(format!(
                "tamaño de modelo desconocido '{}', use 'small' o 'large'",
                other
            ))),
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSize::Small => f.write_str("small"),
            ModelSize::Large => f.write_str("large"),
        }
    }
}

/// Hiperparámetros de evaluación de Siamese Mask R-CNN.
/// Inmutable una vez construido.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub size: ModelSize,
    pub name: String,
    pub gpu_count: u32,
    pub images_per_gpu: u32,
    pub num_classes: usize,  // fondo + "coincide con el target"
    pub num_targets: usize,

    pub target_min_dim: u32,
    pub target_max_dim: u32,
    pub image_min_dim: u32,
    pub image_max_dim: u32,
    pub image_min_scale: f32,
    pub image_resize_mode: ResizeMode,
    pub mean_pixel: [f32; 3],

    pub fpn_classif_fc_layers_size: u32,
    pub fpn_featuremaps: u32,
    pub rpn_anchor_stride: u32,
    pub rpn_train_anchors_per_image: u32,
    pub post_nms_rois_training: u32,
    pub post_nms_rois_inference: u32,
    pub train_rois_per_image: u32,
    pub detection_max_instances: usize,
    pub max_gt_instances: u32,
    pub detection_min_confidence: f32,
}

impl ModelConfig {
    pub fn small() -> Self {
        Self {
            size: ModelSize::Small,
            name: "coco".to_string(),
            gpu_count: 1,
            images_per_gpu: 1,
            num_classes: 1 + 1,
            num_targets: 1,

            target_min_dim: 75,
            target_max_dim: 96,
            image_min_dim: 512,
            image_max_dim: 512,
            image_min_scale: 0.0,
            image_resize_mode: ResizeMode::Square,
            mean_pixel: [123.7, 116.8, 103.9],

            fpn_classif_fc_layers_size: 512,
            fpn_featuremaps: 256,
            rpn_anchor_stride: 2,
            rpn_train_anchors_per_image: 64,
            post_nms_rois_training: 1000,
            post_nms_rois_inference: 500,
            train_rois_per_image: 50,
            detection_max_instances: 50,
            max_gt_instances: 50,
            detection_min_confidence: 0.7,
        }
    }

    pub fn large() -> Self {
        Self {
            size: ModelSize::Large,
            target_min_dim: 150,
            target_max_dim: 192,
            image_min_dim: 800,
            image_max_dim: 1024,
            fpn_classif_fc_layers_size: 1024,
            fpn_featuremaps: 256,
            rpn_anchor_stride: 1,
            rpn_train_anchors_per_image: 256,
            post_nms_rois_training: 2000,
            post_nms_rois_inference: 1000,
            train_rois_per_image: 200,
            detection_max_instances: 100,
            max_gt_instances: 100,
            ..Self::small()
        }
    }

    pub fn for_size(size: ModelSize) -> Self {
        match size {
            ModelSize::Small => Self::small(),
            ModelSize::Large => Self::large(),
        }
    }

    pub fn checkpoint_file(&self) -> &'static str {
        self.size.checkpoint_file()
    }

    /// Límites para la imagen de consulta.
    pub fn image_resize(&self) -> ResizeParams {
        ResizeParams {
            min_dim: self.image_min_dim,
            max_dim: self.image_max_dim,
            min_scale: self.image_min_scale,
            mode: self.image_resize_mode,
        }
    }

    /// Límites para el ejemplar (target).
    pub fn target_resize(&self) -> ResizeParams {
        ResizeParams {
            min_dim: self.target_min_dim,
            max_dim: self.target_max_dim,
            min_scale: self.image_min_scale,
            mode: self.image_resize_mode,
        }
    }

    /// Longitud del vector image_meta: id + 3 + 3 + ventana + escala + clases activas.
    pub fn image_meta_len(&self) -> usize {
        1 + 3 + 3 + 4 + 1 + self.num_classes
    }
}
