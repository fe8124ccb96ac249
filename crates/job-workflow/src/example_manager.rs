// example_manager.rs
// Gestión del pool de ejemplos de un job: relleno acotado, alta, revisión y
// selección de conjuntos de prueba y de combinaciones candidatas.
use crate::errors::{Result, WorkflowError};
use crate::generator::ExampleGenerator;
use job_domain::{Event, EventType, Example, ExampleRecord, ExampleRef, JobRecord, JsonObject, VerificationType};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Criterio de selección del conjunto de prueba.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestSetMode {
  /// Muestra uniforme sin reemplazo.
  #[default]
  Random,
  /// Los ejemplos menos fiables primero.
  Accuracy,
}

pub struct ExampleManager {
  generator: ExampleGenerator,
  batch_size: usize,
  max_fill_attempts: usize,
}

impl ExampleManager {
  pub fn new(generator: ExampleGenerator, batch_size: usize, max_fill_attempts: usize) -> Self {
    Self { generator,
           batch_size: batch_size.max(1),
           max_fill_attempts }
  }

  /// Genera ejemplos por lotes hasta que el pool tenga `total` registros.
  /// Como mucho `max_fill_attempts` lotes; si no se alcanza el objetivo
  /// devuelve `PoolExhausted`. Devuelve cuántos ejemplos se añadieron.
  pub async fn fill_examples(&self, job: &mut JobRecord, total: usize) -> Result<usize> {
    let mut added = 0;
    let mut attempts = 0;
    while job.example_records.len() < total {
      if attempts >= self.max_fill_attempts {
        return Err(WorkflowError::PoolExhausted { target: total,
                                                  reached: job.example_records.len() });
      }
      attempts += 1;
      let missing = total - job.example_records.len();
      let batch = self.create_examples(job, missing.min(self.batch_size)).await?;
      let before = added;
      for record in batch {
        if job.add_example(record) {
          added += 1;
        }
      }
      log::info!("job {}: lote {} de relleno, {} ejemplos nuevos ({}/{})",
                 job.idx,
                 attempts,
                 added - before,
                 job.example_records.len(),
                 total);
    }
    Ok(added)
  }

  /// Genera `num_items` registros sin añadirlos al pool.
  pub async fn create_examples(&self, job: &mut JobRecord, num_items: usize) -> Result<Vec<ExampleRecord>> {
    self.generator.generate(job, num_items).await
  }

  pub fn add_example(&self, job: &mut JobRecord, record: ExampleRecord) -> bool {
    job.add_example(record)
  }

  pub fn get_examples(&self, job: &JobRecord, example_ids: Option<&[String]>) -> Vec<Example> {
    job.get_examples(example_ids)
  }

  /// Nueva revisión de la salida de un ejemplo; registra `example_update`.
  pub fn update_example(&self,
                        job: &mut JobRecord,
                        example_id: &str,
                        output: JsonObject,
                        verification_type: Option<VerificationType>,
                        reliability: Option<f64>)
                        -> Result<u32> {
    let version = job.version;
    let record = job.record_mut(example_id)
                    .ok_or_else(|| job_domain::DomainError::NotFound(format!("ejemplo {}", example_id)))?;
    record.revise(output, verification_type, reliability);
    let example_version = record.version;
    job.log_event(Event::new(EventType::ExampleUpdate).with_example(ExampleRef::One(example_id.to_string()),
                                                                   Some(example_version))
                                                      .with_version(version));
    Ok(example_version)
  }

  pub fn delete_example(&self, _job: &mut JobRecord, example_id: &str) -> Result<()> {
    Err(WorkflowError::Unsupported(format!("borrado del ejemplo {}", example_id)))
  }

  /// Conjunto de prueba de como mucho `size` ejemplos, excluyendo
  /// `exclude`. El tamaño se recorta al pool disponible.
  pub fn get_test_set(&self, job: &JobRecord, size: usize, mode: TestSetMode, exclude: &[String]) -> Vec<ExampleRecord> {
    test_set(job, size, mode, exclude)
  }

  pub fn get_possible_sets(&self, job: &JobRecord, k: usize, exclude: &[String]) -> Combinations {
    possible_sets(job, k, exclude)
  }
}

pub(crate) fn test_set(job: &JobRecord, size: usize, mode: TestSetMode, exclude: &[String]) -> Vec<ExampleRecord> {
  let mut pool: Vec<&ExampleRecord> = job.example_records.iter().filter(|r| !exclude.contains(&r.idx)).collect();
  match mode {
    TestSetMode::Random => pool.choose_multiple(&mut rand::thread_rng(), size)
                               .map(|r| (*r).clone())
                               .collect(),
    TestSetMode::Accuracy => {
      pool.sort_by(|a, b| a.reliability_score().total_cmp(&b.reliability_score()));
      pool.into_iter().take(size).cloned().collect()
    }
  }
}

pub(crate) fn possible_sets(job: &JobRecord, k: usize, exclude: &[String]) -> Combinations {
  let ids = job.example_records
               .iter()
               .filter(|r| !exclude.contains(&r.idx))
               .map(|r| r.idx.clone())
               .collect();
  Combinations::new(ids, k)
}

/// Iterador perezoso de las combinaciones de tamaño `k` de un conjunto de
/// ids, en orden lexicográfico de posiciones.
#[derive(Debug, Clone)]
pub struct Combinations {
  ids: Vec<String>,
  positions: Vec<usize>,
  done: bool,
}

impl Combinations {
  pub fn new(ids: Vec<String>, k: usize) -> Self {
    let done = k == 0 || k > ids.len();
    Self { ids,
           positions: (0..k).collect(),
           done }
  }
}

impl Iterator for Combinations {
  type Item = Vec<String>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.done {
      return None;
    }
    let current = self.positions.iter().map(|&p| self.ids[p].clone()).collect();

    // avanzar a la siguiente combinación
    let n = self.ids.len();
    let k = self.positions.len();
    let mut i = k;
    loop {
      if i == 0 {
        self.done = true;
        break;
      }
      i -= 1;
      if self.positions[i] < n - k + i {
        self.positions[i] += 1;
        for j in i + 1..k {
          self.positions[j] = self.positions[j - 1] + 1;
        }
        break;
      }
    }
    Some(current)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::generator::{MajorityVoteGenerator, VoteMode};
  use job_domain::{DataType, DomainError, DomainStubs};
  use llm_providers::stubs::FnEngineFactory;
  use llm_providers::EngineFactory;
  use serde_json::json;
  use std::collections::HashSet;
  use std::sync::Arc;

  fn o(v: serde_json::Value) -> JsonObject {
    v.as_object().cloned().unwrap_or_default()
  }

  fn manager() -> ExampleManager {
    let factory: Arc<dyn EngineFactory> = Arc::new(FnEngineFactory::new(|_, _, _| Ok(None)));
    let voter = MajorityVoteGenerator::new(factory.clone(), 3, VoteMode::MajorityVote);
    ExampleManager::new(ExampleGenerator::new(factory, voter), 5, 3)
  }

  /// Dos semillas (puntuación 5) y tres sintéticos con puntuaciones 0.5,
  /// 1.2 y 2.7, añadidos en orden inverso.
  fn pool() -> (JobRecord, Vec<String>) {
    let mut job = DomainStubs::sample_job();
    let mut ids = Vec::new();
    for (text, kind, reliability) in [("c", VerificationType::MajorityGrade, 0.9),
                                      ("b", VerificationType::MajorityVote, 0.6),
                                      ("a", VerificationType::SingleVote, 0.5)]
    {
      let record = ExampleRecord::new(o(json!({ "text": text })), o(json!({"sentiment": "positive"})))
        .with_provenance(None, Some(kind), Some(reliability), DataType::Synthetic);
      ids.push(record.idx.clone());
      job.add_example(record);
    }
    ids.reverse();
    (job, ids)
  }

  fn ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("e{}", i)).collect()
  }

  #[test]
  fn combinations_are_lazy_and_complete() {
    let all: Vec<Vec<String>> = Combinations::new(ids(4), 2).collect();
    assert_eq!(all.len(), 6);
    assert_eq!(all[0], vec!["e0".to_string(), "e1".to_string()]);
    assert_eq!(all[5], vec!["e2".to_string(), "e3".to_string()]);

    let mut big = Combinations::new(ids(30), 3);
    assert_eq!(big.next().map(|c| c.len()), Some(3));
  }

  #[test]
  fn combinations_of_impossible_size_are_empty() {
    assert_eq!(Combinations::new(ids(2), 3).count(), 0);
    assert_eq!(Combinations::new(ids(2), 0).count(), 0);
    assert_eq!(Combinations::new(ids(3), 3).count(), 1);
  }

  #[test]
  fn accuracy_test_set_takes_least_reliable_first() {
    let (job, ids) = pool();
    let manager = manager();

    let set: Vec<String> = manager.get_test_set(&job, 2, TestSetMode::Accuracy, &[]).into_iter().map(|r| r.idx).collect();
    assert_eq!(set, vec![ids[0].clone(), ids[1].clone()]);

    let set: Vec<String> = manager.get_test_set(&job, 2, TestSetMode::Accuracy, &[ids[0].clone()])
                                  .into_iter()
                                  .map(|r| r.idx)
                                  .collect();
    assert_eq!(set, vec![ids[1].clone(), ids[2].clone()]);
  }

  #[test]
  fn random_test_set_is_clamped_and_never_repeats() {
    let (job, ids) = pool();
    let manager = manager();

    let all = manager.get_test_set(&job, 50, TestSetMode::Random, &[]);
    assert_eq!(all.len(), job.example_records.len());
    let unique: HashSet<String> = all.iter().map(|r| r.idx.clone()).collect();
    assert_eq!(unique.len(), all.len());

    let some = manager.get_test_set(&job, 3, TestSetMode::Random, &ids[..2]);
    assert_eq!(some.len(), 3);
    assert!(some.iter().all(|r| !ids[..2].contains(&r.idx)));
    assert_eq!(some.iter().map(|r| r.idx.clone()).collect::<HashSet<_>>().len(), 3);

    assert_eq!(manager.get_test_set(&job, 4, TestSetMode::Accuracy, &ids).len(), 2);
  }

  #[test]
  fn update_example_revises_and_logs_the_new_version() {
    let mut job = DomainStubs::sample_job();
    let manager = manager();
    let id = job.example_records[0].idx.clone();

    let version = manager.update_example(&mut job,
                                         &id,
                                         o(json!({"sentiment": "negative"})),
                                         Some(VerificationType::MajorityGrade),
                                         Some(0.9))
                         .expect("update");
    assert_eq!(version, 1);
    let record = &job.example_records[0];
    assert_eq!(record.output()["sentiment"], json!("negative"));
    assert_eq!(record.version_history[&0].output["sentiment"], json!("positive"));
    assert_eq!(record.verification_type, Some(VerificationType::MajorityGrade));

    let event = job.event_log.last().expect("event");
    assert_eq!(event.event_type, EventType::ExampleUpdate);
    assert_eq!(event.example_id, Some(ExampleRef::One(id.clone())));
    assert_eq!(event.example_version, Some(1));
    assert_eq!(event.job_version, Some(0));

    let missing = manager.update_example(&mut job, "nope", JsonObject::new(), None, None);
    assert!(matches!(missing, Err(WorkflowError::Domain(DomainError::NotFound(_)))));
    assert!(matches!(manager.delete_example(&mut job, &id), Err(WorkflowError::Unsupported(_))));
  }
}
