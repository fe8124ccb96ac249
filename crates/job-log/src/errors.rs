// Archivo: errors.rs
// Propósito: definir los errores de las bitácoras y el alias Result<T> usado
// por las APIs del crate.
use thiserror::Error;
/// Errores comunes de las bitácoras de jobs.
///
/// - `NotFound`: bitácora o job no encontrado.
/// - `Storage`: error al acceder al almacenamiento externo.
/// - `Serialization`: línea JSON inválida o no serializable.
#[derive(Error, Debug)]
pub enum LogError {
  /// Bitácora no encontrada.
  #[error("No encontrado: {0}")]
  NotFound(String),
  /// Error genérico de almacenamiento (archivos, memoria, etc.).
  #[error("Error de almacenamiento: {0}")]
  Storage(String),
  /// Error al (de)serializar un registro.
  #[error("Error de serialización: {0}")]
  Serialization(String),
}

impl From<serde_json::Error> for LogError {
  fn from(e: serde_json::Error) -> Self {
    Self::Serialization(e.to_string())
  }
}

impl From<std::io::Error> for LogError {
  fn from(e: std::io::Error) -> Self {
    Self::Storage(e.to_string())
  }
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, LogError>;
