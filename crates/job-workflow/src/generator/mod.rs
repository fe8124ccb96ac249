//! Generadores: estrategias para ejecutar un job contra el motor.
//!
//! - `SimpleGenerator`: una llamada.
//! - `AsyncGenerator` / `SequentialAsyncGenerator` / `MultiVariantGenerator`:
//!   fan-out concurrente con un tope fijo de workers.
//! - `MajorityVoteGenerator`: réplicas de la misma entrada reducidas a una
//!   salida con puntuación de fiabilidad.
//! - `ExampleGenerator`: pares (entrada, salida) nuevos para el pool.
mod concurrent;
mod consensus;
mod examples;
mod simple;
pub mod verification;

pub use concurrent::{fan_out, AsyncGenerator, FanOutInput, MultiVariantGenerator, ResultOrder, SequentialAsyncGenerator};
pub use consensus::{HumanVerifier, MajorityVoteGenerator, VoteMode};
pub use examples::ExampleGenerator;
pub use simple::SimpleGenerator;

use crate::config::GeneratorKind;
use crate::errors::Result;
use async_trait::async_trait;
use job_domain::{Event, JobRecord, JobSetting, JsonObject, VerificationType};
use llm_providers::{EngineFactory, RunMetrics};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Métricas de una llamada de generación. Cuando hubo varias ejecuciones
/// (votos) son la media de todas ellas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GenerationMetrics {
  pub execution_time: f64,
  pub token_usage: f64,
  pub failure_rate: f64,
  pub num_runs: usize,
  pub model_name: Option<String>,
  pub model_config: JsonValue,
  pub errors: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reliability: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub verification_type: Option<VerificationType>,
}

impl GenerationMetrics {
  pub fn from_run(run: &RunMetrics) -> Self {
    Self { execution_time: run.execution_time,
           token_usage: run.token_usage as f64,
           failure_rate: run.failure_rate,
           num_runs: 1,
           model_name: run.model_name.clone(),
           model_config: run.model_config.clone(),
           errors: run.errors.clone().unwrap_or_default(),
           reliability: None,
           verification_type: None }
  }

  pub fn to_json(&self) -> JsonValue {
    serde_json::to_value(self).unwrap_or(JsonValue::Null)
  }
}

/// Contrato común de los generadores de salida.
#[async_trait]
pub trait OutputGenerator: Send + Sync {
  /// Tipo de verificación que se registra con cada generación.
  fn verification_type(&self) -> VerificationType;

  /// Ejecuta el job para una entrada sin tocar sus bitácoras.
  async fn generate(&self, job: &JobRecord, input: &JsonObject, setting: &JobSetting) -> Result<(JsonObject, GenerationMetrics)>;

  /// Ejecuta y registra exactamente un evento `generation` en el job.
  async fn generate_logged(&self,
                           job: &mut JobRecord,
                           input: &JsonObject,
                           setting: &JobSetting)
                           -> Result<(JsonObject, GenerationMetrics, Event)> {
    let (output, mut metrics) = self.generate(job, input, setting).await?;
    metrics.verification_type.get_or_insert(self.verification_type());
    let event = job.log_generation(input, &output, metrics.to_json(), setting);
    Ok((output, metrics, event))
  }
}

impl GeneratorKind {
  /// Construye el generador correspondiente.
  pub fn build(&self, factory: Arc<dyn EngineFactory>, max_workers: usize) -> Box<dyn OutputGenerator> {
    match self {
      GeneratorKind::Simple => Box::new(SimpleGenerator::new(factory)),
      GeneratorKind::Consensus { num_votes,
                                 mode,
                                 min_votes, } => {
        Box::new(MajorityVoteGenerator::new(factory, *num_votes, *mode).with_min_votes(*min_votes)
                                                                       .with_max_workers(max_workers))
      }
    }
  }
}
