use super::{GenerationMetrics, OutputGenerator};
use crate::errors::{Result, WorkflowError};
use async_trait::async_trait;
use job_domain::{JobRecord, JobSetting, JsonObject, VerificationType};
use llm_providers::{EngineFactory, PromptTemplate};
use std::sync::Arc;

/// Una única llamada al motor.
pub struct SimpleGenerator {
  factory: Arc<dyn EngineFactory>,
}

impl SimpleGenerator {
  pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
    Self { factory }
  }
}

#[async_trait]
impl OutputGenerator for SimpleGenerator {
  fn verification_type(&self) -> VerificationType {
    VerificationType::SingleVote
  }

  async fn generate(&self, job: &JobRecord, input: &JsonObject, setting: &JobSetting) -> Result<(JsonObject, GenerationMetrics)> {
    let engine = self.factory.from_template(&PromptTemplate::Job(job.prompt_for(setting)))?;
    let out = engine.run(input)
                    .await?
                    .ok_or_else(|| WorkflowError::NoVotes(format!("el motor omitió la llamada del job {}", job.idx)))?;
    let missing = job.output_model.missing_keys(&out.output);
    if !missing.is_empty() {
      log::warn!("job {}: salida sin las claves {:?}", job.idx, missing);
    }
    let mut metrics = GenerationMetrics::from_run(&out.metrics);
    metrics.verification_type = Some(self.verification_type());
    Ok((out.output, metrics))
  }
}
