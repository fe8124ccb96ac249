// metrics.rs
// Métricas de evaluación: exactitud explícita (igualdad) o implícita (juicio
// del motor) y medias de las métricas de ejecución.
use crate::engine_call::object;
use crate::errors::Result;
use crate::generator::fan_out;
use crate::generator::verification::strip_reasoning;
use crate::generator::ResultOrder;
use job_domain::JsonObject;
use llm_providers::{BuiltinTemplate, EngineFactory, EngineOutput, PromptTemplate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

/// Métrica que maximizan los optimizadores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
  #[default]
  Accuracy,
  FailureRate,
}

/// Métricas de una muestra o de una corrida de evaluación. Cada instancia
/// es propia; no hay valores por defecto compartidos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EvalMetrics {
  pub accuracy: f64,
  pub execution_time: f64,
  pub failure_rate: f64,
  pub token_usage: f64,
  pub num_runs: f64,
  pub model_name: Option<String>,
  pub model_config: JsonValue,
  pub errors: Vec<String>,
}

impl EvalMetrics {
  pub fn get(&self, metric: Metric) -> f64 {
    match metric {
      Metric::Accuracy => self.accuracy,
      Metric::FailureRate => self.failure_rate,
    }
  }

  pub fn to_json(&self) -> JsonValue {
    serde_json::to_value(self).unwrap_or(JsonValue::Null)
  }

  /// Métricas de ejecución medias de las corridas de una muestra, con la
  /// exactitud ya calculada.
  pub(crate) fn from_runs(accuracy: f64, runs: &[EngineOutput]) -> Self {
    let n = runs.len() as f64;
    let mean = |f: fn(&EngineOutput) -> f64| {
      if runs.is_empty() {
        0.0
      } else {
        runs.iter().map(f).sum::<f64>() / n
      }
    };
    let first = runs.first();
    Self { accuracy,
           execution_time: mean(|r| r.metrics.execution_time),
           failure_rate: mean(|r| r.metrics.failure_rate),
           token_usage: mean(|r| r.metrics.token_usage as f64),
           num_runs: n,
           model_name: first.and_then(|r| r.metrics.model_name.clone()),
           model_config: first.map(|r| r.metrics.model_config.clone()).unwrap_or_else(|| json!({})),
           errors: runs.iter().flat_map(|r| r.metrics.errors.clone().unwrap_or_default()).collect() }
  }
}

/// Media de medias. Un agregado vacío da ceros.
pub fn average(samples: &[EvalMetrics]) -> EvalMetrics {
  let Some(first) = samples.first() else {
    return EvalMetrics { model_config: json!({}),
                         ..EvalMetrics::default() };
  };
  let n = samples.len() as f64;
  let mean = |f: fn(&EvalMetrics) -> f64| samples.iter().map(f).sum::<f64>() / n;
  EvalMetrics { accuracy: mean(|m| m.accuracy),
                execution_time: mean(|m| m.execution_time),
                failure_rate: mean(|m| m.failure_rate),
                token_usage: mean(|m| m.token_usage),
                num_runs: mean(|m| m.num_runs),
                model_name: first.model_name.clone(),
                model_config: first.model_config.clone(),
                errors: samples.iter().flat_map(|m| m.errors.clone()).collect() }
}

/// Fracción de salidas iguales a la ideal (sin claves de razonamiento).
/// Sin salidas la exactitud es 0.
pub fn explicit_accuracy(outputs: &[JsonObject], ideal: &JsonObject) -> f64 {
  if outputs.is_empty() {
    return 0.0;
  }
  let ideal = strip_reasoning(ideal);
  let hits = outputs.iter().filter(|o| strip_reasoning(o) == ideal).count();
  hits as f64 / outputs.len() as f64
}

/// Exactitud juzgada por el motor: cada salida se compara con la ideal y
/// cuenta como correcta salvo desacuerdo (`D`). Una respuesta ausente o sin
/// `choice` cuenta como incorrecta.
pub async fn implicit_accuracy(factory: Arc<dyn EngineFactory>,
                               instruction: Option<&str>,
                               input: &JsonObject,
                               outputs: &[JsonObject],
                               ideal: &JsonObject,
                               max_workers: usize)
                               -> Result<f64> {
  if outputs.is_empty() {
    return Ok(0.0);
  }
  let requests = outputs.iter()
                        .map(|o| {
                          object([("instruction", json!(instruction.unwrap_or_default())),
                                  ("example_input", JsonValue::Object(input.clone())),
                                  ("ideal_output", JsonValue::Object(ideal.clone())),
                                  ("output", JsonValue::Object(o.clone()))])
                        })
                        .collect();
  let judged = fan_out(factory,
                       PromptTemplate::Builtin(BuiltinTemplate::MatchResponse),
                       requests,
                       max_workers,
                       ResultOrder::Completion).await?;
  if judged.len() < outputs.len() {
    log::warn!("{} juicios sin respuesta; cuentan como incorrectos", outputs.len() - judged.len());
  }
  let hits = judged.iter()
                   .filter(|j| match j.output.get("choice").and_then(JsonValue::as_str) {
                     Some(choice) => !choice.trim().trim_matches(|c: char| c == '(' || c == ')').eq_ignore_ascii_case("D"),
                     None => {
                       log::warn!("Juicio sin 'choice'; cuenta como incorrecto");
                       false
                     }
                   })
                   .count();
  Ok(hits as f64 / outputs.len() as f64)
}
