use thiserror::Error;

// Errores comunes del ciclo de vida de jobs.
//
// Este enum centraliza los errores que pueden ocurrir durante la
// generación, evaluación y optimización: errores del dominio
// (`DomainError`), del motor (`EngineError`), de bitácoras, validaciones
// de argumentos y caminos no implementados.
#[derive(Error, Debug)]
pub enum WorkflowError {
  /// Errores originados por el dominio o el almacenamiento de jobs.
  #[error("Error de dominio: {0}")]
  Domain(#[from] job_domain::DomainError),

  /// Fallos del motor de completado. Nunca se reintentan aquí.
  #[error("Error del motor: {0}")]
  Engine(#[from] llm_providers::EngineError),

  /// Errores de las bitácoras append-only.
  #[error("Error de bitácora: {0}")]
  Log(#[from] job_log::LogError),

  /// Errores de serializacion/deserializacion JSON.
  #[error("Error de serializacion: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Argumentos incompatibles o incompletos.
  #[error("Error de validacion: {0}")]
  Validation(String),

  /// Salida del motor vacía o sin las claves esperadas.
  #[error("Salida inválida del motor: {0}")]
  EngineOutput(String),

  /// Ninguna ejecución devolvió salida.
  #[error("Sin votos: {0}")]
  NoVotes(String),

  /// Camino explícitamente no implementado.
  #[error("No soportado: {0}")]
  Unsupported(String),

  /// El pool de ejemplos no alcanzó el tamaño pedido dentro del límite de
  /// intentos.
  #[error("No se alcanzó el tamaño del pool de ejemplos: {reached}/{target}")]
  PoolExhausted { target: usize, reached: usize },

  /// Fallo al unir una tarea concurrente.
  #[error("Error de tarea concurrente: {0}")]
  Join(String),
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, WorkflowError>;
