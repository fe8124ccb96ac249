use super::concurrent::{AsyncGenerator, FanOutInput};
use super::verification::{get_best_output, majority_vote, merge_metrics, unique_outputs};
use super::{GenerationMetrics, OutputGenerator};
use crate::errors::{Result, WorkflowError};
use async_trait::async_trait;
use job_domain::{JobRecord, JobSetting, JsonObject, VerificationType};
use llm_providers::EngineFactory;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Fiabilidad fija cuando la salida se elige por desempate o por nota.
pub const TIE_BREAK_RELIABILITY: f64 = 0.9;

/// Cómo se reduce la lista de votos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VoteMode {
  /// Conteo de votos; desempate por el motor si no hay mayoría.
  #[default]
  MajorityVote,
  /// Siempre elige el motor entre las salidas únicas.
  MajorityGrade,
  /// Elige una persona entre las salidas únicas.
  HumanVerified,
}

/// Paso de verificación humana.
#[async_trait]
pub trait HumanVerifier: Send + Sync {
  /// Devuelve la salida elegida (o corregida) para `input`.
  async fn choose(&self, job: &JobRecord, input: &JsonObject, candidates: &[JsonObject]) -> Result<JsonObject>;
}

/// `num_votes` réplicas de la misma entrada reducidas a una salida.
pub struct MajorityVoteGenerator {
  factory: Arc<dyn EngineFactory>,
  num_votes: usize,
  min_votes: usize,
  mode: VoteMode,
  max_workers: usize,
  verifier: Option<Arc<dyn HumanVerifier>>,
}

impl MajorityVoteGenerator {
  pub fn new(factory: Arc<dyn EngineFactory>, num_votes: usize, mode: VoteMode) -> Self {
    Self { factory,
           num_votes,
           min_votes: 2,
           mode,
           max_workers: num_votes.max(1),
           verifier: None }
  }

  pub fn with_min_votes(mut self, min_votes: usize) -> Self {
    self.min_votes = min_votes;
    self
  }

  pub fn with_max_workers(mut self, max_workers: usize) -> Self {
    self.max_workers = max_workers;
    self
  }

  pub fn with_mode(mut self, mode: VoteMode) -> Self {
    self.mode = mode;
    self
  }

  pub fn with_verifier(mut self, verifier: Arc<dyn HumanVerifier>) -> Self {
    self.verifier = Some(verifier);
    self
  }

  pub fn mode(&self) -> VoteMode {
    self.mode
  }
}

#[async_trait]
impl OutputGenerator for MajorityVoteGenerator {
  fn verification_type(&self) -> VerificationType {
    match self.mode {
      VoteMode::MajorityVote => VerificationType::MajorityVote,
      VoteMode::MajorityGrade => VerificationType::MajorityGrade,
      VoteMode::HumanVerified => VerificationType::HumanVerified,
    }
  }

  async fn generate(&self, job: &JobRecord, input: &JsonObject, setting: &JobSetting) -> Result<(JsonObject, GenerationMetrics)> {
    let fan_out = AsyncGenerator::new(self.factory.clone(), self.max_workers);
    let runs = fan_out.run(job, setting, FanOutInput::Replicate(input.clone(), self.num_votes)).await?;
    if runs.is_empty() {
      return Err(WorkflowError::NoVotes(format!("ninguno de los {} votos devolvió salida", self.num_votes)));
    }
    let run_metrics: Vec<_> = runs.iter().map(|r| r.metrics.clone()).collect();
    let outputs: Vec<JsonObject> = runs.into_iter().map(|r| r.output).collect();
    let instruction = setting.instruction.as_deref().or(job.instruction.as_deref());

    let (output, reliability) = match self.mode {
      VoteMode::MajorityVote => match majority_vote(&outputs, self.min_votes) {
        Some(winner) => winner,
        None => {
          log::info!("job {}: sin mayoría en {} votos, se desempata", job.idx, outputs.len());
          let best = get_best_output(self.factory.as_ref(), instruction, input, &unique_outputs(&outputs)).await?;
          (best, TIE_BREAK_RELIABILITY)
        }
      },
      VoteMode::MajorityGrade => {
        let best = get_best_output(self.factory.as_ref(), instruction, input, &unique_outputs(&outputs)).await?;
        (best, TIE_BREAK_RELIABILITY)
      }
      VoteMode::HumanVerified => {
        let verifier = self.verifier
                           .as_ref()
                           .ok_or_else(|| WorkflowError::Unsupported("verificación humana sin verificador".to_string()))?;
        (verifier.choose(job, input, &unique_outputs(&outputs)).await?, 1.0)
      }
    };

    let mut metrics = merge_metrics(&run_metrics);
    metrics.reliability = Some(reliability);
    metrics.verification_type = Some(self.verification_type());
    Ok((output, metrics))
  }
}
