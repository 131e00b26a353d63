use image::{imageops::{self, FilterType}, DynamicImage, RgbImage};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

/// Estrategia de redimensionado, con la misma semántica que el `resize_image`
/// de Mask R-CNN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Sin cambios.
    None,
    /// Escala y rellena con ceros hasta `max_dim x max_dim`.
    Square,
    /// Escala y rellena hasta múltiplos de 64.
    Pad64,
    /// Recorte aleatorio de `min_dim x min_dim`.
    Crop,
}

/// Límites de redimensionado. Un valor `0` equivale a "sin límite".
#[derive(Debug, Clone, Copy)]
pub struct ResizeParams {
    pub min_dim: u32,
    pub max_dim: u32,
    pub min_scale: f32,
    pub mode: ResizeMode,
}

/// Imagen redimensionada junto con la geometría necesaria para deshacer el cambio.
#[derive(Debug, Clone)]
pub struct Resized {
    pub image: RgbImage,
    /// (y1, x1, y2, x2) de la imagen útil dentro del lienzo rellenado.
    pub window: [u32; 4],
    pub scale: f32,
    /// ((arriba, abajo), (izquierda, derecha))
    pub padding: [(u32, u32); 2],
    /// (y, x, alto, ancho) cuando el modo es `Crop`.
    pub crop: Option<[u32; 4]>,
}

/// Reduce cualquier imagen a 3 canales RGB (descarta alfa, expande gris).
pub fn drop_alpha(image: DynamicImage) -> RgbImage {
    image.into_rgb8()
}

pub fn resize_image<R: Rng>(
    image: &RgbImage,
    params: &ResizeParams,
    rng: &mut R,
) -> DomainResult<Resized> {
    let (w, h) = image.dimensions();
    if h == 0 || w == 0 {
        return Err(DomainError::InvalidInput("imagen vacía".into()));
    }

    let mut out = Resized {
        image: image.clone(),
        window: [0, 0, h, w],
        scale: 1.0,
        padding: [(0, 0), (0, 0)],
        crop: None,
    };
    if params.mode == ResizeMode::None {
        return Ok(out);
    }

    let mut scale = 1.0f32;
    if params.min_dim > 0 {
        scale = f32::max(1.0, params.min_dim as f32 / h.min(w) as f32);
    }
    if params.min_scale > 0.0 && scale < params.min_scale {
        scale = params.min_scale;
    }
    if params.max_dim > 0 && params.mode == ResizeMode::Square {
        let image_max = h.max(w) as f32;
        if (image_max * scale).round() > params.max_dim as f32 {
            scale = params.max_dim as f32 / image_max;
        }
    }

    if scale != 1.0 {
        let new_h = ((h as f32 * scale).round() as u32).max(1);
        let new_w = ((w as f32 * scale).round() as u32).max(1);
        out.image = imageops::resize(image, new_w, new_h, FilterType::Triangle);
    }
    out.scale = scale;

    let (w, h) = out.image.dimensions();
    match params.mode {
        ResizeMode::None => {}
        ResizeMode::Square => {
            let max_dim = params.max_dim;
            if max_dim == 0 || h > max_dim || w > max_dim {
                return Err(DomainError::InvalidInput(format!(
                    "modo square requiere max_dim >= {}x{} (max_dim = {})",
                    h, w, max_dim
                )));
            }
            let top = (max_dim - h) / 2;
            let left = (max_dim - w) / 2;
            out.image = pad(&out.image, max_dim, max_dim, top, left);
            out.padding = [(top, max_dim - h - top), (left, max_dim - w - left)];
            out.window = [top, left, h + top, w + left];
        }
        ResizeMode::Pad64 => {
            if params.min_dim % 64 != 0 {
                return Err(DomainError::InvalidInput(format!(
                    "min_dim {} no es múltiplo de 64",
                    params.min_dim
                )));
            }
            let (top, bottom) = pad_to_64(h);
            let (left, right) = pad_to_64(w);
            out.image = pad(&out.image, h + top + bottom, w + left + right, top, left);
            out.padding = [(top, bottom), (left, right)];
            out.window = [top, left, h + top, w + left];
        }
        ResizeMode::Crop => {
            let d = params.min_dim;
            if d == 0 || h < d || w < d {
                return Err(DomainError::InvalidInput(format!(
                    "imagen {}x{} menor que el recorte {}",
                    h, w, d
                )));
            }
            let y = rng.random_range(0..=h - d);
            let x = rng.random_range(0..=w - d);
            out.image = imageops::crop_imm(&out.image, x, y, d, d).to_image();
            out.crop = Some([y, x, d, d]);
            out.window = [0, 0, d, d];
        }
    }
    Ok(out)
}

fn pad_to_64(len: u32) -> (u32, u32) {
    if len % 64 == 0 {
        return (0, 0);
    }
    let target = len - len % 64 + 64;
    let first = (target - len) / 2;
    (first, target - len - first)
}

fn pad(image: &RgbImage, height: u32, width: u32, top: u32, left: u32) -> RgbImage {
    let mut canvas = RgbImage::new(width, height);
    imageops::replace(&mut canvas, image, left as i64, top as i64);
    canvas
}
