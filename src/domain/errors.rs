use thiserror::Error;

/// Mensaje fijo devuelto al cliente cuando la categoría está fuera de rango.
pub const CATEGORY_RANGE_MSG: &str = "Please indicate a number in the range from 1 to 80";

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No encontrado: {0}")]
    NotFound(String),
    #[error("Entrada inválida: {0}")]
    InvalidInput(String),
    #[error("Categoría fuera de rango: {0}")]
    CategoryOutOfRange(i64),
    #[error("Error de operación: {0}")]
    OperationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
