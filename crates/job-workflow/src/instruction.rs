// instruction.rs
// Derivación, variación y mutación de instrucciones con una única llamada
// al motor por operación.
use crate::engine_call::{object, run_builtin, str_field, str_list};
use crate::errors::{Result, WorkflowError};
use job_domain::{Example, IoModel, JobRecord, JsonObject};
use llm_providers::{BuiltinTemplate, EngineFactory};
use rand::seq::SliceRandom;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

/// Directivas de mutación entre las que se elige al mutar una instrucción.
pub const MUTATION_DIRECTIVES: [&str; 5] = ["Make the instruction more concise while keeping its meaning.",
                                             "Rephrase the instruction as a step by step procedure.",
                                             "Make the instruction more specific about the expected output.",
                                             "Rewrite the instruction for a domain expert.",
                                             "Rewrite the instruction for a beginner."];

pub struct InstructionGenerator {
  factory: Arc<dyn EngineFactory>,
}

impl InstructionGenerator {
  pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
    Self { factory }
  }

  /// Instrucción para un job: a partir de su primer ejemplo si lo tiene,
  /// si no sólo a partir de los esquemas.
  pub async fn generate(&self, job: &JobRecord) -> Result<String> {
    match job.example_records.first() {
      Some(record) => self.from_working_out(record.input(), record.output()).await,
      None => self.from_models(&job.input_model, &job.output_model).await,
    }
  }

  pub async fn from_models(&self, input_model: &IoModel, output_model: &IoModel) -> Result<String> {
    let request = object([("inp_model", json!(input_model.to_string())), ("out_model", json!(output_model.to_string()))]);
    let out = run_builtin(self.factory.as_ref(), BuiltinTemplate::InstructionFromModels, request).await?;
    str_field(&out.output, "instruction")
  }

  pub async fn from_working_out(&self, input: &JsonObject, output: &JsonObject) -> Result<String> {
    let request = object([("input_object", JsonValue::Object(input.clone())),
                          ("output_object", JsonValue::Object(output.clone()))]);
    let out = run_builtin(self.factory.as_ref(), BuiltinTemplate::InstructionFromWorkingOut, request).await?;
    str_field(&out.output, "the_instruction_was")
  }

  /// `num` formulaciones alternativas a partir de un conjunto de ejemplos.
  pub async fn variants(&self, examples: &[Example], num: usize) -> Result<Vec<String>> {
    let example_set: Vec<JsonValue> = examples.iter()
                                              .map(|e| json!({"input": e.input, "output": e.output}))
                                              .collect();
    let request = object([("num_instructions", json!(num)), ("example_set", JsonValue::Array(example_set))]);
    let out = run_builtin(self.factory.as_ref(), BuiltinTemplate::InstructionVariants, request).await?;
    let mut variants = str_list(&out.output, "instructions")?;
    variants.truncate(num);
    Ok(variants)
  }

  /// `num` mutaciones de una instrucción con una directiva al azar.
  pub async fn mutate(&self, instruction: &str, num: usize) -> Result<Vec<String>> {
    let directive = MUTATION_DIRECTIVES.choose(&mut rand::thread_rng())
                                       .copied()
                                       .unwrap_or(MUTATION_DIRECTIVES[0]);
    let request = object([("mutation_instruction", json!(directive)),
                          ("instruction", json!(instruction)),
                          ("num_mutations", json!(num))]);
    let out = run_builtin(self.factory.as_ref(), BuiltinTemplate::MutateInstruction, request).await?;
    let mut mutated = str_list(&out.output, "mutated_instructions")?;
    mutated.truncate(num);
    Ok(mutated)
  }

  /// Completa una instrucción con lo que describen los esquemas.
  pub async fn extend_by_model(&self, instruction: &str, input_model: &IoModel, output_model: &IoModel) -> Result<String> {
    let request = object([("mutate_instruction", json!(instruction)),
                          ("inp_model", json!(input_model.to_string())),
                          ("out_model", json!(output_model.to_string()))]);
    let out = run_builtin(self.factory.as_ref(), BuiltinTemplate::ExtendInstructionByModel, request).await?;
    str_field(&out.output, "the_instruction_was")
  }

  /// Mutaciones de la instrucción actual del job, cada una completada con
  /// sus esquemas.
  pub async fn mutations_for(&self, job: &JobRecord, num: usize) -> Result<Vec<String>> {
    let instruction = job.instruction
                         .as_deref()
                         .ok_or_else(|| WorkflowError::Validation(format!("el job {} no tiene instrucción", job.idx)))?;
    let mut extended = Vec::new();
    for mutated in self.mutate(instruction, num).await? {
      extended.push(self.extend_by_model(&mutated, &job.input_model, &job.output_model).await?);
    }
    Ok(extended)
  }
}
