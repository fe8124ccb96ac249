use super::consensus::MajorityVoteGenerator;
use super::OutputGenerator;
use crate::engine_call::{object, run_builtin};
use crate::errors::Result;
use job_domain::{DataType, ExampleRecord, JobRecord, JobSetting, JsonObject};
use llm_providers::{BuiltinTemplate, EngineFactory};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

/// Genera pares (entrada, salida) nuevos para un job en dos fases:
/// entradas propuestas por el motor y salidas por consenso.
pub struct ExampleGenerator {
  factory: Arc<dyn EngineFactory>,
  voter: MajorityVoteGenerator,
}

impl ExampleGenerator {
  pub fn new(factory: Arc<dyn EngineFactory>, voter: MajorityVoteGenerator) -> Self {
    Self { factory, voter }
  }

  /// Fase 1: hasta `num_items` entradas nuevas. La no repetición se pide en
  /// el prompt; aquí no se filtra contra el pool.
  pub async fn propose_inputs(&self, job: &JobRecord, num_items: usize) -> Result<Vec<JsonObject>> {
    let existing: Vec<JsonValue> = job.example_records.iter().map(|r| JsonValue::Object(r.input().clone())).collect();
    let request = object([("instruction", json!(job.instruction.clone().unwrap_or_default())),
                          ("num_examples", json!(num_items)),
                          ("input_example", JsonValue::Array(existing))]);
    let out = run_builtin(self.factory.as_ref(), BuiltinTemplate::ExtendInputs, request).await?;
    let proposed = out.output.get("outputs").and_then(JsonValue::as_array).cloned().unwrap_or_default();
    let inputs: Vec<JsonObject> = proposed.into_iter()
                                          .filter_map(|v| match v {
                                            JsonValue::Object(o) => Some(o),
                                            other => {
                                              log::warn!("Entrada propuesta descartada (no es objeto): {}", other);
                                              None
                                            }
                                          })
                                          .take(num_items)
                                          .collect();
    Ok(inputs)
  }

  /// Genera los registros sin añadirlos al pool. Cada salida pasa por el
  /// votador, que registra su evento `generation` en el job; el registro
  /// guarda ese evento como procedencia.
  pub async fn generate(&self, job: &mut JobRecord, num_items: usize) -> Result<Vec<ExampleRecord>> {
    let inputs = self.propose_inputs(job, num_items).await?;
    let mut records = Vec::with_capacity(inputs.len());
    for input in inputs {
      let (output, metrics, event) = self.voter.generate_logged(job, &input, &JobSetting::default()).await?;
      let mut record = ExampleRecord::new(input, output).with_provenance(Some(event.event_id),
                                                                         metrics.verification_type,
                                                                         metrics.reliability,
                                                                         DataType::Synthetic);
      record.version = job.version;
      records.push(record);
    }
    Ok(records)
  }
}
