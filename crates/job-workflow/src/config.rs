// config.rs
// Ajustes de programa y de optimización. Todos los tipos son serde con
// defaults, de modo que una configuración parcial en JSON es válida.
use crate::errors::{Result, WorkflowError};
use crate::evaluation::Metric;
use crate::example_manager::TestSetMode;
use crate::generator::VoteMode;
use llm_providers::EngineOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

/// Tipo de prompt del programa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
  #[default]
  ZeroShot,
  OneShot,
  FewShot,
  ZeroShotCot,
  OneShotCot,
  FewShotCot,
}

/// Estrategia de generación. Conjunto cerrado: un tipo desconocido falla al
/// construir la configuración, nunca al generar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum GeneratorKind {
  #[default]
  Simple,
  Consensus {
    #[serde(default = "default_num_votes")]
    num_votes: usize,
    #[serde(default)]
    mode: VoteMode,
    #[serde(default = "default_min_votes")]
    min_votes: usize,
  },
}

fn default_num_votes() -> usize {
  5
}

fn default_min_votes() -> usize {
  2
}

impl GeneratorKind {
  pub fn consensus() -> Self {
    GeneratorKind::Consensus { num_votes: default_num_votes(),
                               mode: VoteMode::MajorityVote,
                               min_votes: default_min_votes() }
  }
}

impl FromStr for GeneratorKind {
  type Err = WorkflowError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "simple" | "default" => Ok(GeneratorKind::Simple),
      "consensus" | "majority_vote" => Ok(GeneratorKind::consensus()),
      "majority_grade" => Ok(GeneratorKind::Consensus { num_votes: default_num_votes(),
                                                        mode: VoteMode::MajorityGrade,
                                                        min_votes: default_min_votes() }),
      other => Err(WorkflowError::Validation(format!("Tipo de generador no soportado: '{}'", other))),
    }
  }
}

/// Constantes de los optimizadores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
  pub min_examples: usize,
  pub test_size: usize,
  pub prompt_sample_size: usize,
  pub select_mode: TestSetMode,
  pub instruction_test_size: usize,
  pub max_examples_per_prompt: usize,
  pub metric: Metric,
  /// Parar la búsqueda de ejemplos en cuanto un tamaño empeora.
  pub early_stopping: bool,
  /// Añadir mutaciones de la instrucción actual a los candidatos.
  pub include_mutations: bool,
}

impl Default for OptimizerSettings {
  fn default() -> Self {
    Self { min_examples: 20,
           test_size: 5,
           prompt_sample_size: 3,
           select_mode: TestSetMode::Accuracy,
           instruction_test_size: 5,
           max_examples_per_prompt: 4,
           metric: Metric::Accuracy,
           early_stopping: true,
           include_mutations: false }
  }
}

/// Configuración de un programa (se guarda como `config` del job).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramSettings {
  pub auto_optimize: bool,
  pub generator_type: GeneratorKind,
  pub program_type: PromptType,

  pub total_sample_size: usize,
  pub max_few_shot_size: usize,

  // primera ejecución
  pub fr_optimization: bool,
  /// Elegir la salida de la primera ejecución con un `HumanVerifier`.
  pub fr_human_verification: bool,

  // optimización
  pub test_size: usize,
  pub test_set_selection: TestSetMode,
  pub runs_per_input: usize,
  pub metric: Metric,
  pub early_stopping: bool,

  // concurrencia y límites
  pub max_workers: usize,
  pub max_fill_attempts: usize,
  pub example_batch_size: usize,

  pub model: EngineOptions,
}

impl Default for ProgramSettings {
  fn default() -> Self {
    Self { auto_optimize: true,
           generator_type: GeneratorKind::Simple,
           program_type: PromptType::ZeroShot,
           total_sample_size: 20,
           max_few_shot_size: 5,
           fr_optimization: true,
           fr_human_verification: false,
           test_size: 5,
           test_set_selection: TestSetMode::Accuracy,
           runs_per_input: 5,
           metric: Metric::Accuracy,
           early_stopping: true,
           max_workers: 8,
           max_fill_attempts: 5,
           example_batch_size: 5,
           model: EngineOptions::default() }
  }
}

impl ProgramSettings {
  pub fn from_json(text: &str) -> Result<Self> {
    let settings: Self = serde_json::from_str(text)?;
    settings.validate()?;
    Ok(settings)
  }

  pub fn validate(&self) -> Result<()> {
    if self.max_workers == 0 {
      return Err(WorkflowError::Validation("max_workers debe ser mayor que 0".to_string()));
    }
    if self.runs_per_input == 0 {
      return Err(WorkflowError::Validation("runs_per_input debe ser mayor que 0".to_string()));
    }
    if let GeneratorKind::Consensus { num_votes, min_votes, .. } = &self.generator_type {
      if *num_votes == 0 || *min_votes == 0 {
        return Err(WorkflowError::Validation("num_votes y min_votes deben ser mayores que 0".to_string()));
      }
    }
    Ok(())
  }

  pub fn to_json(&self) -> JsonValue {
    serde_json::to_value(self).unwrap_or(JsonValue::Null)
  }

  /// Ajustes de optimizador derivados del programa.
  pub fn optimizer_settings(&self) -> OptimizerSettings {
    OptimizerSettings { min_examples: self.total_sample_size,
                        test_size: self.test_size,
                        select_mode: self.test_set_selection,
                        metric: self.metric,
                        max_examples_per_prompt: self.max_few_shot_size,
                        early_stopping: self.early_stopping,
                        ..OptimizerSettings::default() }
  }
}
