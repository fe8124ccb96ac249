// engine.rs
use crate::template::PromptTemplate;
use crate::EngineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Objeto JSON estructurado (entrada o salida de una tarea).
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Métricas que el motor reporta por cada llamada.
///
/// `failure_rate` vale 1.0 cuando no hubo fallos internos; valores menores
/// indican reintentos dentro del motor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
  pub execution_time: f64,
  pub token_usage: u64,
  #[serde(default)]
  pub model_name: Option<String>,
  #[serde(default)]
  pub model_config: JsonValue,
  pub failure_rate: f64,
  #[serde(default)]
  pub errors: Option<Vec<String>>,
}

impl Default for RunMetrics {
  fn default() -> Self {
    Self { execution_time: 0.0,
           token_usage: 0,
           model_name: None,
           model_config: JsonValue::Object(JsonObject::new()),
           failure_rate: 1.0,
           errors: None }
  }
}

/// Resultado parseado de una llamada al motor.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
  pub output: JsonObject,
  pub metrics: RunMetrics,
}

/// Motor listo para ejecutar una plantilla concreta.
///
/// `Ok(None)` indica que el motor decidió omitir la llamada; los generadores
/// filtran esos resultados sin reintentar.
#[async_trait]
pub trait Engine: Send + Sync {
  async fn run(&self, input: &JsonObject) -> Result<Option<EngineOutput>, EngineError>;
}

/// Construye motores a partir de una plantilla.
pub trait EngineFactory: Send + Sync {
  fn from_template(&self, template: &PromptTemplate) -> Result<Arc<dyn Engine>, EngineError>;
}
