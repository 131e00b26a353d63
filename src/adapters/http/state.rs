use std::sync::Arc;
use crate::application::services::SearchService;

/// Estado compartido para los manejadores HTTP de Axum.
/// Se construye una vez al arrancar, con el modelo y el índice ya cargados.
#[derive(Clone)]
pub struct HttpState {
    /// Casos de uso de búsqueda visual (modelo + dataset).
    pub search: Arc<SearchService>,
}
