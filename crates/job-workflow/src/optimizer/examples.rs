use super::{best_index, pair_results, prepare_job};
use crate::config::OptimizerSettings;
use crate::errors::Result;
use crate::evaluation::{EvalMetrics, EvaluationEngine};
use crate::example_manager::ExampleManager;
use job_domain::{JobRecord, JobSetting};

/// Resultado de una búsqueda de conjunto de ejemplos.
#[derive(Debug, Clone)]
pub struct ExampleSearch {
  /// Mejor conjunto retenido (vacío si no se retuvo ninguno).
  pub best_setting: JobSetting,
  pub best_metrics: Option<EvalMetrics>,
  /// Métrica retenida tras cada iteración; nunca decrece.
  pub history: Vec<f64>,
  /// Todos los candidatos evaluados.
  pub results: Vec<(JobSetting, EvalMetrics)>,
  pub test_set_ids: Vec<String>,
}

pub struct ExampleOptimizer {
  manager: ExampleManager,
  evaluator: EvaluationEngine,
  settings: OptimizerSettings,
}

impl ExampleOptimizer {
  pub fn new(manager: ExampleManager, evaluator: EvaluationEngine, settings: OptimizerSettings) -> Self {
    Self { manager,
           evaluator,
           settings }
  }

  /// Búsqueda voraz por tamaño: en cada iteración se prueba añadir cada
  /// ejemplo restante al conjunto actual y se avanza con el mejor. Se
  /// retiene si no empeora; si empeora se para, salvo con `early_stopping`
  /// desactivado, en cuyo caso se sigue creciendo y se conserva el mejor
  /// visto. Como mucho `max_examples_per_prompt - 1` iteraciones.
  pub async fn optimize(&self, job: &mut JobRecord) -> Result<ExampleSearch> {
    let test_set = prepare_job(job, &self.manager, &self.settings, self.settings.test_size).await?;
    let test_set_ids: Vec<String> = test_set.iter().map(|r| r.idx.clone()).collect();

    let metric = self.settings.metric;
    let mut current: Vec<String> = Vec::new();
    let mut best_ids: Vec<String> = Vec::new();
    let mut best_metrics: Option<EvalMetrics> = None;
    let mut history = Vec::new();
    let mut results = Vec::new();

    for size in 1..self.settings.max_examples_per_prompt {
      let mut exclude = test_set_ids.clone();
      exclude.extend(current.iter().cloned());
      let remaining: Vec<String> = job.example_records
                                      .iter()
                                      .filter(|r| !exclude.contains(&r.idx))
                                      .map(|r| r.idx.clone())
                                      .collect();
      if remaining.is_empty() {
        break;
      }
      let settings: Vec<JobSetting> = remaining.into_iter()
                                               .map(|id| {
                                                 let mut ids = current.clone();
                                                 ids.push(id);
                                                 JobSetting::with_examples(job.instruction.clone(), ids)
                                               })
                                               .collect();
      let metrics = self.evaluator.evaluate_settings(job, &test_set, &settings).await?;
      let Some(best) = best_index(&metrics, metric) else {
        break;
      };
      let candidate = metrics[best].clone();
      let value = candidate.get(metric);
      let running = best_metrics.as_ref().map(|m| m.get(metric)).unwrap_or(f64::NEG_INFINITY);
      let chosen = settings[best].example_ids.clone().unwrap_or_default();
      results.extend(pair_results(settings, metrics));

      if value < running {
        if self.settings.early_stopping {
          log::info!("job {}: tamaño {} empeora ({:.3} < {:.3}), se detiene", job.idx, size, value, running);
          break;
        }
        log::info!("job {}: tamaño {} empeora ({:.3} < {:.3}), se sigue", job.idx, size, value, running);
        current = chosen;
        history.push(running);
        continue;
      }
      log::info!("job {}: tamaño {} retenido con {:.3}", job.idx, size, value);
      current = chosen;
      best_ids = current.clone();
      history.push(value);
      best_metrics = Some(candidate);
    }

    Ok(ExampleSearch { best_setting: JobSetting::with_examples(job.instruction.clone(), best_ids),
                       best_metrics,
                       history,
                       results,
                       test_set_ids })
  }
}
