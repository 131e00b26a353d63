use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use image::{imageops::{self, FilterType}, ImageBuffer, Luma, RgbImage};
use ndarray::{s, Array1, Array2, Array3, Array4, ArrayView2, ArrayView4, Axis};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Value;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::application::ports::DetectorPort;
use crate::domain::detection::DetectionResult;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::imaging::resize_image;
use crate::domain::model::ModelConfig;

const MASK_THRESHOLD: f32 = 0.5;

/// Siamese Mask R-CNN exportado a ONNX.
///
/// La sesión se crea una sola vez y queda protegida por un `Mutex`: las
/// inferencias concurrentes se serializan sobre el mismo contexto de ejecución.
#[derive(Clone)]
pub struct SiameseEngine {
    session: Arc<Mutex<Session>>,
    config: Arc<ModelConfig>,
}

impl SiameseEngine {
    pub fn load(path: &Path, config: ModelConfig) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA es opcional: si está disponible se registra, si no continuamos en CPU.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        let model_bytes = fs::read(path)
            .with_context(|| format!("leyendo checkpoint {}", path.display()))?;
        let session = builder.commit_from_memory(&model_bytes)?;
        info!(
            "Modelo {} cargado desde {} ({} MB)",
            config.size,
            path.display(),
            model_bytes.len() / (1024 * 1024)
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            config: Arc::new(config),
        })
    }

    /// Ejecuta una inferencia completa: moldeado, red y desmoldeado.
    pub fn infer(&self, target: &RgbImage, image: &RgbImage) -> Result<DetectionResult> {
        let cfg = &self.config;
        let (orig_w, orig_h) = image.dimensions();

        let molded = resize_image(image, &cfg.image_resize(), &mut rand::rng())?;
        let (mol_w, mol_h) = molded.image.dimensions();
        let meta = compose_image_meta(
            0,
            (orig_h, orig_w),
            (mol_h, mol_w),
            molded.window,
            molded.scale,
            cfg.num_classes,
        );

        let (tw, th) = target.dimensions();
        let image_tensor = Value::from_array((
            vec![1, mol_h as i64, mol_w as i64, 3],
            mold_pixels(&molded.image, cfg.mean_pixel),
        ))?;
        let meta_tensor = Value::from_array((vec![1, meta.len() as i64], meta))?;
        let target_tensor = Value::from_array((
            vec![1, cfg.num_targets as i64, th as i64, tw as i64, 3],
            mold_pixels(target, cfg.mean_pixel),
        ))?;

        let (detections, masks) = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow!("sesión de inferencia envenenada"))?;
            let outputs = session.run(ort::inputs![
                "input_image" => image_tensor,
                "input_image_meta" => meta_tensor,
                "input_targets" => target_tensor
            ])?;

            let (det_shape, det_data) = outputs["detections"].try_extract_tensor::<f32>()?;
            let det_dims: Vec<usize> = det_shape.iter().map(|&d| d as usize).collect();
            let (mask_shape, mask_data) = outputs["mrcnn_mask"].try_extract_tensor::<f32>()?;
            let mask_dims: Vec<usize> = mask_shape.iter().map(|&d| d as usize).collect();

            if det_dims.len() != 3
                || det_dims[2] != 6
                || mask_dims.len() != 5
                || mask_dims[1] < det_dims[1]
            {
                bail!("salidas inesperadas: detections {:?}, mrcnn_mask {:?}", det_dims, mask_dims);
            }
            let detections = Array2::from_shape_vec((det_dims[1], 6), det_data.to_vec())?;
            let masks = Array4::from_shape_vec(
                (mask_dims[1], mask_dims[2], mask_dims[3], mask_dims[4]),
                mask_data.to_vec(),
            )?;
            (detections, masks)
        };

        let result = unmold_detections(
            detections.view(),
            masks.view(),
            (orig_h, orig_w),
            (mol_h, mol_w),
            molded.window,
        )?;
        debug!("Inferencia: {} instancias", result.len());
        Ok(result)
    }
}

#[async_trait]
impl DetectorPort for SiameseEngine {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    async fn detect(&self, target: RgbImage, image: RgbImage) -> DomainResult<DetectionResult> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.infer(&target, &image))
            .await
            .map_err(|e| DomainError::OperationFailed(format!("tarea de inferencia: {}", e)))?
            .map_err(|e| DomainError::OperationFailed(format!("inferencia fallida: {:#}", e)))
    }
}

/// Vector image_meta: [id, alto/ancho/canales originales, alto/ancho/canales
/// moldeados, ventana (y1, x1, y2, x2), escala, clases activas].
pub fn compose_image_meta(
    image_id: u64,
    original: (u32, u32),
    molded: (u32, u32),
    window: [u32; 4],
    scale: f32,
    num_classes: usize,
) -> Vec<f32> {
    let mut meta = vec![
        image_id as f32,
        original.0 as f32,
        original.1 as f32,
        3.0,
        molded.0 as f32,
        molded.1 as f32,
        3.0,
    ];
    meta.extend(window.iter().map(|&v| v as f32));
    meta.push(scale);
    meta.extend(std::iter::repeat(0.0).take(num_classes));
    meta
}

/// Píxeles en orden HWC menos el píxel medio.
fn mold_pixels(image: &RgbImage, mean: [f32; 3]) -> Vec<f32> {
    image
        .pixels()
        .flat_map(|p| [p[0] as f32 - mean[0], p[1] as f32 - mean[1], p[2] as f32 - mean[2]])
        .collect()
}

/// Normaliza una caja en píxeles al rango [0, 1] de una imagen (h, w).
fn norm_box(b: [f32; 4], (h, w): (u32, u32)) -> [f32; 4] {
    let (sh, sw) = ((h - 1) as f32, (w - 1) as f32);
    [b[0] / sh, b[1] / sw, (b[2] - 1.0) / sh, (b[3] - 1.0) / sw]
}

fn denorm_box(b: [f32; 4], (h, w): (u32, u32)) -> [i32; 4] {
    let (sh, sw) = ((h - 1) as f32, (w - 1) as f32);
    [
        (b[0] * sh).round() as i32,
        (b[1] * sw).round() as i32,
        (b[2] * sh + 1.0).round() as i32,
        (b[3] * sw + 1.0).round() as i32,
    ]
}

/// Lleva las detecciones normalizadas de la red a coordenadas de la imagen
/// original y pega cada máscara en una máscara de tamaño completo.
pub fn unmold_detections(
    detections: ArrayView2<f32>,
    mrcnn_mask: ArrayView4<f32>,
    original: (u32, u32),
    molded: (u32, u32),
    window: [u32; 4],
) -> Result<DetectionResult> {
    let (oh, ow) = original;
    if oh < 2 || ow < 2 || molded.0 < 2 || molded.1 < 2 {
        bail!("imagen demasiado pequeña: {:?} / {:?}", original, molded);
    }

    // Las filas de relleno tienen class_id == 0.
    let n = detections
        .axis_iter(Axis(0))
        .position(|row| row[4] == 0.0)
        .unwrap_or(detections.nrows());
    if n == 0 {
        return Ok(DetectionResult::empty(oh as usize, ow as usize));
    }

    let w = window.map(|v| v as f32);
    let nw = norm_box(w, molded);
    let (wh, ww) = (nw[2] - nw[0], nw[3] - nw[1]);

    let mut rois = Vec::new();
    let mut class_ids = Vec::new();
    let mut scores = Vec::new();
    let mut full_masks = Vec::new();

    for i in 0..n {
        let row = detections.row(i);
        let shifted = [
            (row[0] - nw[0]) / wh,
            (row[1] - nw[1]) / ww,
            (row[2] - nw[0]) / wh,
            (row[3] - nw[1]) / ww,
        ];
        let roi = denorm_box(shifted, original);
        if (roi[2] - roi[0]) * (roi[3] - roi[1]) <= 0 {
            continue;
        }

        let class_id = row[4] as usize;
        if class_id >= mrcnn_mask.shape()[3] {
            bail!("class_id {} fuera del rango de máscaras", class_id);
        }
        let mask = mrcnn_mask.slice(s![i, .., .., class_id]);
        full_masks.push(unmold_mask(mask, roi, original));

        rois.extend_from_slice(&roi);
        class_ids.push(class_id as i32);
        scores.push(row[5]);
    }

    let kept = class_ids.len();
    let mut masks = Array3::from_elem((kept, oh as usize, ow as usize), false);
    for (i, m) in full_masks.into_iter().enumerate() {
        masks.index_axis_mut(Axis(0), i).assign(&m);
    }

    Ok(DetectionResult {
        rois: Array2::from_shape_vec((kept, 4), rois)?,
        masks,
        class_ids: Array1::from(class_ids),
        scores: Array1::from(scores),
    })
}

/// Redimensiona la máscara de la red a la caja, umbraliza y la coloca en
/// una máscara del tamaño de la imagen original.
fn unmold_mask(mask: ArrayView2<f32>, roi: [i32; 4], (oh, ow): (u32, u32)) -> Array2<bool> {
    let [y1, x1, y2, x2] = roi;
    let (bh, bw) = ((y2 - y1) as u32, (x2 - x1) as u32);
    let (mh, mw) = mask.dim();

    let small: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(mw as u32, mh as u32, |x, y| Luma([mask[[y as usize, x as usize]]]));
    let resized = imageops::resize(&small, bw, bh, FilterType::Triangle);

    let mut full = Array2::from_elem((oh as usize, ow as usize), false);
    for (x, y, p) in resized.enumerate_pixels() {
        let (fy, fx) = (y1 + y as i32, x1 + x as i32);
        if fy < 0 || fx < 0 || fy >= oh as i32 || fx >= ow as i32 {
            continue;
        }
        full[[fy as usize, fx as usize]] = p[0] >= MASK_THRESHOLD;
    }
    full
}
