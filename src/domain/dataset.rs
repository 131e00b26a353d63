use rand::{seq::IndexedRandom, Rng};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::errors::{DomainError, DomainResult};

pub type ImageId = u64;

/// Número de clases de COCO (sin contar el fondo).
pub const NUM_COCO_CLASSES: u32 = 80;

/// Clases "one-shot": una de cada cuatro, empezando por la 1 (20 en total).
pub fn one_shot_classes() -> Vec<u32> {
    (0..20).map(|i| 4 * i + 1).collect()
}

// --- Formato del fichero de anotaciones COCO (instances_*.json) ---

#[derive(Debug, Clone, Deserialize)]
pub struct CocoDocument {
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CocoImage {
    pub id: ImageId,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CocoAnnotation {
    pub image_id: ImageId,
    pub category_id: u32,
    /// [x, y, ancho, alto]
    pub bbox: [f32; 4],
    #[serde(default)]
    pub iscrowd: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CocoCategory {
    pub id: u32,
    pub name: String,
}

/// Caja entera (y1, x1, y2, x2), extremo final exclusivo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub y1: u32,
    pub x1: u32,
    pub y2: u32,
    pub x2: u32,
}

impl BBox {
    /// Convierte una caja COCO [x, y, w, h] recortándola a la imagen.
    /// Devuelve `None` si queda vacía.
    pub fn from_xywh(b: [f32; 4], width: u32, height: u32) -> Option<Self> {
        let [x, y, w, h] = b;
        let clamp = |v: f32, max: u32| (v.max(0.0) as u32).min(max);
        let bbox = Self {
            y1: clamp(y.floor(), height),
            x1: clamp(x.floor(), width),
            y2: clamp((y + h).ceil(), height),
            x2: clamp((x + w).ceil(), width),
        };
        (bbox.y2 > bbox.y1 && bbox.x2 > bbox.x1).then_some(bbox)
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub class_id: u32,
    pub bbox: BBox,
}

#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub id: ImageId,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    /// Instancias no-crowd, candidatas a ejemplar.
    pub instances: Vec<Instance>,
}

/// Índice categoría → imágenes construido una sola vez al arrancar.
///
/// Los ids de categoría COCO (1..90, con huecos) se remapean a ids internos
/// contiguos 1..=80 en orden ascendente; el 0 queda reservado para el fondo.
#[derive(Debug, Clone)]
pub struct DatasetIndex {
    class_names: Vec<String>,
    images: BTreeMap<ImageId, ImageRecord>,
    category_image_index: BTreeMap<u32, Vec<ImageId>>,
    active_classes: Vec<u32>,
}

impl DatasetIndex {
    pub fn from_coco(doc: CocoDocument) -> DomainResult<Self> {
        if doc.categories.is_empty() {
            return Err(DomainError::InvalidInput("el dataset no declara categorías".into()));
        }

        let mut categories = doc.categories;
        categories.sort_by_key(|c| c.id);
        let mut class_names = vec!["BG".to_string()];
        let mut source_to_internal = BTreeMap::new();
        for (i, cat) in categories.into_iter().enumerate() {
            source_to_internal.insert(cat.id, i as u32 + 1);
            class_names.push(cat.name);
        }

        let mut images: BTreeMap<ImageId, ImageRecord> = doc
            .images
            .into_iter()
            .map(|img| {
                let rec = ImageRecord {
                    id: img.id,
                    file_name: img.file_name,
                    width: img.width,
                    height: img.height,
                    instances: Vec::new(),
                };
                (img.id, rec)
            })
            .collect();

        let mut image_categories: BTreeMap<ImageId, BTreeSet<u32>> = BTreeMap::new();
        for ann in doc.annotations {
            let Some(&class_id) = source_to_internal.get(&ann.category_id) else {
                continue;
            };
            let Some(rec) = images.get_mut(&ann.image_id) else {
                continue;
            };
            image_categories.entry(ann.image_id).or_default().insert(class_id);
            if ann.iscrowd != 0 {
                continue;
            }
            if let Some(bbox) = BBox::from_xywh(ann.bbox, rec.width, rec.height) {
                rec.instances.push(Instance { class_id, bbox });
            }
        }

        // Solo se conservan las imágenes con alguna anotación.
        images.retain(|id, _| image_categories.contains_key(id));

        let mut category_image_index: BTreeMap<u32, Vec<ImageId>> = BTreeMap::new();
        for (image_id, classes) in &image_categories {
            for class_id in classes {
                category_image_index.entry(*class_id).or_default().push(*image_id);
            }
        }

        Ok(Self {
            class_names,
            images,
            category_image_index,
            active_classes: one_shot_classes(),
        })
    }

    /// Número de clases incluyendo el fondo.
    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    pub fn class_name(&self, class_id: u32) -> Option<&str> {
        self.class_names.get(class_id as usize).map(String::as_str)
    }

    pub fn num_images(&self) -> usize {
        self.images.len()
    }

    pub fn image(&self, id: ImageId) -> Option<&ImageRecord> {
        self.images.get(&id)
    }

    pub fn images_of(&self, category: u32) -> &[ImageId] {
        self.category_image_index
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn active_classes(&self) -> &[u32] {
        &self.active_classes
    }

    /// Imagen elegida uniformemente entre las que contienen la categoría.
    pub fn sample_image<R: Rng>(&self, category: u32, rng: &mut R) -> DomainResult<ImageId> {
        self.images_of(category)
            .choose(rng)
            .copied()
            .ok_or_else(|| DomainError::NotFound(format!("no hay imágenes para la categoría {}", category)))
    }

    /// Elige una instancia no-crowd de la categoría para recortar el target.
    ///
    /// Las imágenes donde la categoría solo aparece como crowd no sirven de
    /// ejemplar, así que se sortea entre las que tienen alguna instancia útil.
    pub fn sample_instance<R: Rng>(
        &self,
        category: u32,
        rng: &mut R,
    ) -> DomainResult<(&ImageRecord, BBox)> {
        let usable: Vec<&ImageRecord> = self
            .images_of(category)
            .iter()
            .filter_map(|id| self.images.get(id))
            .filter(|rec| rec.instances.iter().any(|i| i.class_id == category))
            .collect();
        let rec = usable.choose(rng).copied().ok_or_else(|| {
            DomainError::NotFound(format!(
                "ninguna instancia utilizable de la categoría {}",
                category
            ))
        })?;
        let candidates: Vec<BBox> = rec
            .instances
            .iter()
            .filter(|i| i.class_id == category)
            .map(|i| i.bbox)
            .collect();
        let bbox = candidates
            .choose(rng)
            .copied()
            .ok_or_else(|| DomainError::OperationFailed("índice de instancias inconsistente".into()))?;
        Ok((rec, bbox))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use serde_json::json;

    /// Tres categorías COCO con ids no contiguos (1, 3, 90) y tres imágenes.
    fn sample_document() -> CocoDocument {
        serde_json::from_value(json!({
            "images": [
                { "id": 10, "file_name": "a.jpg", "width": 64, "height": 48 },
                { "id": 11, "file_name": "b.jpg", "width": 64, "height": 48 },
                { "id": 12, "file_name": "c.jpg", "width": 64, "height": 48 },
                { "id": 13, "file_name": "empty.jpg", "width": 64, "height": 48 }
            ],
            "annotations": [
                { "id": 1, "image_id": 10, "category_id": 1, "bbox": [4.0, 2.0, 20.0, 10.0], "iscrowd": 0 },
                { "id": 2, "image_id": 10, "category_id": 90, "bbox": [30.0, 20.0, 8.5, 8.5], "iscrowd": 0 },
                { "id": 3, "image_id": 11, "category_id": 1, "bbox": [0.0, 0.0, 64.0, 48.0], "iscrowd": 1 },
                { "id": 4, "image_id": 12, "category_id": 3, "bbox": [60.0, 40.0, 10.0, 10.0] }
            ],
            "categories": [
                { "id": 90, "name": "toothbrush" },
                { "id": 1, "name": "person" },
                { "id": 3, "name": "car" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn one_shot_classes_are_every_fourth() {
        let classes = one_shot_classes();
        assert_eq!(classes.len(), 20);
        assert_eq!(&classes[..3], &[1, 5, 9]);
        assert_eq!(*classes.last().unwrap(), 77);
    }

    #[test]
    fn remaps_coco_ids_to_contiguous_classes() {
        let index = DatasetIndex::from_coco(sample_document()).unwrap();
        assert_eq!(index.num_classes(), 4);
        assert_eq!(index.class_name(1), Some("person"));
        assert_eq!(index.class_name(2), Some("car"));
        assert_eq!(index.class_name(3), Some("toothbrush"));
        assert_eq!(index.active_classes(), one_shot_classes().as_slice());
    }

    #[test]
    fn category_index_includes_crowd_images() {
        let index = DatasetIndex::from_coco(sample_document()).unwrap();
        assert_eq!(index.images_of(1), &[10, 11]);
        assert_eq!(index.images_of(2), &[12]);
        assert_eq!(index.images_of(3), &[10]);
        assert!(index.images_of(42).is_empty());
        // imagen sin anotaciones descartada
        assert_eq!(index.num_images(), 3);
        assert!(index.image(13).is_none());
    }

    #[test]
    fn boxes_are_clamped_to_the_image() {
        let index = DatasetIndex::from_coco(sample_document()).unwrap();
        let car = &index.image(12).unwrap().instances[0];
        assert_eq!(car.bbox, BBox { y1: 40, x1: 60, y2: 48, x2: 64 });
        let brush = &index.image(10).unwrap().instances[1];
        assert_eq!((brush.bbox.height(), brush.bbox.width()), (9, 9));
        assert!(BBox::from_xywh([70.0, 0.0, 5.0, 5.0], 64, 48).is_none());
    }

    #[test]
    fn sample_instance_skips_crowd_annotations() {
        let index = DatasetIndex::from_coco(sample_document()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let (rec, bbox) = index.sample_instance(1, &mut rng).unwrap();
            assert_eq!(rec.id, 10);
            assert_eq!(bbox, BBox { y1: 2, x1: 4, y2: 12, x2: 24 });
        }
    }

    #[test]
    fn sampling_unknown_category_is_not_found() {
        let index = DatasetIndex::from_coco(sample_document()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(index.sample_image(50, &mut rng), Err(DomainError::NotFound(_))));
        assert!(matches!(index.sample_instance(0, &mut rng), Err(DomainError::NotFound(_))));
    }
}
