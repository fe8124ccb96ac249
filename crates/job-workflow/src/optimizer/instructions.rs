use super::{best_index, pair_results, prepare_job};
use crate::config::OptimizerSettings;
use crate::errors::{Result, WorkflowError};
use crate::evaluation::{EvalMetrics, EvaluationEngine};
use crate::example_manager::ExampleManager;
use crate::instruction::InstructionGenerator;
use job_domain::{Example, JobRecord, JobSetting};

/// Resultado de una búsqueda de instrucción.
#[derive(Debug, Clone)]
pub struct InstructionSearch {
  pub best_setting: JobSetting,
  pub best_metrics: EvalMetrics,
  /// Cada candidato con su métrica, en orden de generación.
  pub results: Vec<(JobSetting, EvalMetrics)>,
  pub test_set_ids: Vec<String>,
}

pub struct InstructionOptimizer {
  manager: ExampleManager,
  evaluator: EvaluationEngine,
  instructions: InstructionGenerator,
  settings: OptimizerSettings,
}

impl InstructionOptimizer {
  pub fn new(manager: ExampleManager,
             evaluator: EvaluationEngine,
             instructions: InstructionGenerator,
             settings: OptimizerSettings)
             -> Self {
    Self { manager,
           evaluator,
           instructions,
           settings }
  }

  /// Genera `num_candidates` instrucciones (más mutaciones de la actual si
  /// está configurado) y las evalúa con el mismo conjunto de ejemplos en el
  /// prompt y el mismo conjunto de prueba.
  pub async fn optimize(&self, job: &mut JobRecord, num_candidates: usize) -> Result<InstructionSearch> {
    let test_set = prepare_job(job, &self.manager, &self.settings, self.settings.instruction_test_size).await?;
    let test_set_ids: Vec<String> = test_set.iter().map(|r| r.idx.clone()).collect();

    let prompt_set = self.manager
                         .get_test_set(job, self.settings.prompt_sample_size, self.settings.select_mode, &test_set_ids);
    let prompt_ids: Vec<String> = prompt_set.iter().map(|r| r.idx.clone()).collect();
    let prompt_examples: Vec<Example> = prompt_set.into_iter().map(|r| r.example).collect();

    let mut candidates = self.instructions.variants(&prompt_examples, num_candidates).await?;
    if self.settings.include_mutations && job.instruction.is_some() {
      candidates.extend(self.instructions.mutations_for(job, num_candidates).await?);
    }
    if candidates.is_empty() {
      return Err(WorkflowError::EngineOutput("el motor no propuso instrucciones".to_string()));
    }
    log::info!("job {}: evaluando {} instrucciones candidatas", job.idx, candidates.len());

    let settings: Vec<JobSetting> = candidates.into_iter()
                                              .map(|c| JobSetting::with_examples(Some(c), prompt_ids.clone()))
                                              .collect();
    let metrics = self.evaluator.evaluate_settings(job, &test_set, &settings).await?;
    let best = best_index(&metrics, self.settings.metric).ok_or_else(|| WorkflowError::Validation("sin candidatos evaluados".to_string()))?;
    let results = pair_results(settings, metrics);
    let (best_setting, best_metrics) = results[best].clone();
    Ok(InstructionSearch { best_setting,
                           best_metrics,
                           results,
                           test_set_ids })
  }
}
