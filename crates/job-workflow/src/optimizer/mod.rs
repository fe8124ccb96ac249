//! Optimizadores voraces de instrucción y de conjunto de ejemplos.
//!
//! Ambos siguen el mismo esquema: asegurar un pool mínimo, apartar un
//! conjunto de prueba, generar candidatos, evaluarlos contra ese conjunto y
//! quedarse con el que maximiza la métrica. Ninguno promueve el resultado
//! al job; eso queda en manos del llamador (`JobManager::apply_setting`).
mod examples;
mod instructions;

pub use examples::{ExampleOptimizer, ExampleSearch};
pub use instructions::{InstructionOptimizer, InstructionSearch};

use crate::config::OptimizerSettings;
use crate::errors::Result;
use crate::evaluation::{EvalMetrics, Metric};
use crate::example_manager::ExampleManager;
use job_domain::{ExampleRecord, JobRecord, JobSetting};

/// Rellena el pool si está por debajo del mínimo y devuelve el conjunto de
/// prueba apartado.
pub(crate) async fn prepare_job(job: &mut JobRecord,
                                manager: &ExampleManager,
                                settings: &OptimizerSettings,
                                test_size: usize)
                                -> Result<Vec<ExampleRecord>> {
  if job.example_records.len() < settings.min_examples {
    log::info!("job {}: pool de {} ejemplos, se rellena hasta {}",
               job.idx,
               job.example_records.len(),
               settings.min_examples);
    manager.fill_examples(job, settings.min_examples).await?;
  }
  Ok(manager.get_test_set(job, test_size, settings.select_mode, &[]))
}

/// Índice del primer candidato con la métrica máxima.
pub(crate) fn best_index(results: &[EvalMetrics], metric: Metric) -> Option<usize> {
  let mut best: Option<(usize, f64)> = None;
  for (i, m) in results.iter().enumerate() {
    let value = m.get(metric);
    if best.map_or(true, |(_, b)| value > b) {
      best = Some((i, value));
    }
  }
  best.map(|(i, _)| i)
}

pub(crate) fn pair_results(settings: Vec<JobSetting>, metrics: Vec<EvalMetrics>) -> Vec<(JobSetting, EvalMetrics)> {
  settings.into_iter().zip(metrics).collect()
}
