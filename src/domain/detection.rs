use ndarray::{Array1, Array2, Array3, ArrayBase, Axis, Data, Dimension};
use serde_json::Value;

/// Resultado de una llamada a `detect`: cuatro secuencias paralelas,
/// una entrada por instancia detectada.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// [N, 4] como (y1, x1, y2, x2) en píxeles de la imagen de entrada.
    pub rois: Array2<i32>,
    /// [N, H, W], una máscara booleana por instancia.
    pub masks: Array3<bool>,
    pub class_ids: Array1<i32>,
    pub scores: Array1<f32>,
}

impl DetectionResult {
    pub fn empty(height: usize, width: usize) -> Self {
        Self {
            rois: Array2::zeros((0, 4)),
            masks: Array3::from_elem((0, height, width), false),
            class_ids: Array1::zeros(0),
            scores: Array1::zeros(0),
        }
    }

    pub fn len(&self) -> usize {
        self.class_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Conversión a listas anidadas de números aptas para JSON.
pub trait ToNested {
    fn to_nested(&self) -> Value;
}

impl<S, D> ToNested for ArrayBase<S, D>
where
    S: Data,
    S::Elem: Clone + Into<Value>,
    D: Dimension,
{
    fn to_nested(&self) -> Value {
        if self.ndim() == 0 {
            return self.iter().next().cloned().map(Into::into).unwrap_or(Value::Null);
        }
        if self.ndim() == 1 {
            return Value::Array(self.iter().cloned().map(Into::into).collect());
        }
        Value::Array(self.view().into_dyn().axis_iter(Axis(0)).map(|sub| sub.to_nested()).collect())
    }
}

/// Un valor que ya es una lista anidada se devuelve tal cual.
impl ToNested for Value {
    fn to_nested(&self) -> Value {
        self.clone()
    }
}
