// errors.rs
use job_log::LogError;
use llm_providers::EngineError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
  #[error("Error de validación: {0}")]
  ValidationError(String),
  #[error("No encontrado: {0}")]
  NotFound(String),
  #[error("Error externo: {0}")]
  ExternalError(String),
  #[error("Error de serialización: {0}")]
  SerializationError(String),
  #[error("Error de almacenamiento: {0}")]
  StorageError(String),
  #[error("No soportado: {0}")]
  Unsupported(String),
}

impl From<EngineError> for DomainError {
  fn from(e: EngineError) -> Self {
    Self::ExternalError(e.to_string())
  }
}

impl From<serde_json::Error> for DomainError {
  fn from(e: serde_json::Error) -> Self {
    Self::SerializationError(e.to_string())
  }
}

impl From<LogError> for DomainError {
  fn from(e: LogError) -> Self {
    match e {
      LogError::NotFound(m) => Self::NotFound(m),
      LogError::Serialization(m) => Self::SerializationError(m),
      LogError::Storage(m) => Self::StorageError(m),
    }
  }
}

impl From<std::io::Error> for DomainError {
  fn from(e: std::io::Error) -> Self {
    Self::StorageError(e.to_string())
  }
}
