use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::detection::{DetectionResult, ToNested};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRequest {
    pub number: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Resultado serializado: listas de listas para cajas y máscaras,
/// listas planas para clases y puntuaciones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResponse {
    pub rois: Value,
    pub masks: Value,
    pub class_ids: Value,
    pub scores: Value,
}

impl From<&DetectionResult> for PredictionResponse {
    fn from(r: &DetectionResult) -> Self {
        Self {
            rois: r.rois.to_nested(),
            masks: r.masks.to_nested(),
            class_ids: r.class_ids.to_nested(),
            scores: r.scores.to_nested(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array3};
    use serde_json::json;

    #[test]
    fn empty_result_serializes_to_empty_arrays() {
        let body = PredictionResponse::from(&DetectionResult::empty(8, 8));
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v, json!({ "rois": [], "masks": [], "class_ids": [], "scores": [] }));
    }

    #[test]
    fn sequences_share_leading_length() {
        let r = DetectionResult {
            rois: arr2(&[[0, 0, 2, 2], [1, 1, 3, 3]]),
            masks: Array3::from_elem((2, 4, 4), true),
            class_ids: arr1(&[1, 1]),
            scores: arr1(&[0.9, 0.8]),
        };
        let body = PredictionResponse::from(&r);
        for v in [&body.rois, &body.masks, &body.class_ids, &body.scores] {
            assert_eq!(v.as_array().unwrap().len(), r.len());
        }
        assert_eq!(body.masks[1][3], json!([true, true, true, true]));
    }
}
