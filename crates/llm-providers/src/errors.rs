use thiserror::Error;

/// Errores reportados por el motor de completado.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
  #[error("Error de inicialización del motor: {0}")]
  Init(String),
  #[error("Error de llamada al modelo: {0}")]
  Call(String),
  #[error("Salida no parseable: {0}")]
  Parse(String),
}
