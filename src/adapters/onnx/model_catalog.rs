use std::path::PathBuf;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::ModelConfig;

/// Directorio de checkpoints exportados a ONNX.
pub struct OnnxModelCatalog {
    dir: PathBuf,
}

impl OnnxModelCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Ruta del checkpoint que corresponde a la configuración; error si no existe en disco.
    pub fn resolve(&self, config: &ModelConfig) -> DomainResult<PathBuf> {
        let path = self.dir.join(config.checkpoint_file());
        if !path.is_file() {
            return Err(DomainError::NotFound(format!(
                "checkpoint no encontrado: {}",
                path.display()
            )));
        }
        Ok(path)
    }
}
