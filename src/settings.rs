use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

pub const SETTINGS: &str = "Settings.toml";

/// Rutas y parámetros de arranque del servicio.
/// Cualquier clave ausente en el fichero toma su valor por defecto.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Raíz del dataset COCO (contiene `annotations/` y `<subset><year>/`).
    pub coco_data: PathBuf,
    pub coco_subset: String,
    pub coco_year: String,
    /// Directorio donde deben existir las imágenes que se "suben".
    pub app_test_data: PathBuf,
    pub checkpoint_dir: PathBuf,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            coco_data: PathBuf::from("data/coco"),
            coco_subset: "val".to_string(),
            coco_year: "2017".to_string(),
            app_test_data: PathBuf::from("data/test"),
            checkpoint_dir: PathBuf::from("checkpoints"),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Lee el fichero si existe; si no, devuelve los valores por defecto.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = read_to_string(path)
            .with_context(|| format!("leyendo {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("configuración inválida en {}", path.display()))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
