use super::metrics::{average, explicit_accuracy, implicit_accuracy, EvalMetrics};
use crate::errors::{Result, WorkflowError};
use crate::generator::MultiVariantGenerator;
use job_domain::{Event, ExampleRecord, JobRecord, JobSetting, JsonObject};
use llm_providers::EngineFactory;
use std::sync::Arc;

/// Ejecuta variantes de un job sobre ejemplos con salida ideal conocida y
/// registra una métrica por ejemplo y otra agregada por variante.
pub struct EvaluationEngine {
  factory: Arc<dyn EngineFactory>,
  runs_per_sample: usize,
  max_workers: usize,
}

impl EvaluationEngine {
  pub fn new(factory: Arc<dyn EngineFactory>, runs_per_sample: usize, max_workers: usize) -> Self {
    Self { factory,
           runs_per_sample: runs_per_sample.max(1),
           max_workers: max_workers.max(1) }
  }

  pub async fn evaluate(&self, job: &mut JobRecord, records: &[ExampleRecord], setting: &JobSetting) -> Result<EvalMetrics> {
    let mut all = self.evaluate_settings(job, records, std::slice::from_ref(setting)).await?;
    all.pop()
       .ok_or_else(|| WorkflowError::Validation("evaluación sin resultado".to_string()))
  }

  /// Evalúa varias variantes en paralelo. El resultado `i` corresponde a
  /// `settings[i]`. Los eventos se registran al final, en orden.
  pub async fn evaluate_settings(&self,
                                 job: &mut JobRecord,
                                 records: &[ExampleRecord],
                                 settings: &[JobSetting])
                                 -> Result<Vec<EvalMetrics>> {
    if records.is_empty() {
      return Err(WorkflowError::Validation("no hay ejemplos que evaluar".to_string()));
    }
    let inputs: Vec<JsonObject> = records.iter().map(|r| r.input().clone()).collect();
    let runner = MultiVariantGenerator::new(self.factory.clone(), self.runs_per_sample, self.max_workers);
    let per_setting = runner.run(job, settings, &inputs).await?;

    let mut results = Vec::with_capacity(settings.len());
    for (setting, per_record) in settings.iter().zip(per_setting) {
      let instruction = setting.instruction.clone().or_else(|| job.instruction.clone());
      let mut samples = Vec::with_capacity(records.len());
      for (record, runs) in records.iter().zip(per_record) {
        let outputs: Vec<JsonObject> = runs.iter().map(|r| r.output.clone()).collect();
        let accuracy = if job.is_explicit {
          explicit_accuracy(&outputs, record.output())
        } else {
          implicit_accuracy(self.factory.clone(),
                            instruction.as_deref(),
                            record.input(),
                            &outputs,
                            record.output(),
                            self.max_workers).await?
        };
        let sample = EvalMetrics::from_runs(accuracy, &runs);
        job.log_event(Event::from_sample_metric(sample.to_json(), setting.to_json(), &record.idx).with_version(job.version));
        samples.push(sample);
      }

      let aggregate = average(&samples);
      let ids = records.iter().map(|r| r.idx.clone()).collect();
      job.log_event(Event::from_evaluation_metric(aggregate.to_json(), setting.to_json(), ids).with_version(job.version));
      log::info!("job {}: variante evaluada, accuracy {:.3} sobre {} ejemplos",
                 job.idx,
                 aggregate.accuracy,
                 records.len());
      results.push(aggregate);
    }
    Ok(results)
  }
}
