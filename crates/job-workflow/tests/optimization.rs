use job_domain::{EventType, InMemoryJobRepository, JobLookup, JobRecord, JobSetting, JsonObject};
use job_workflow::evaluation::explicit_accuracy;
use job_workflow::{CreateJobRequest, EvaluationEngine, JobManager, ProgramSettings};
use llm_providers::stubs::FnEngineFactory;
use llm_providers::{BuiltinTemplate, PromptTemplate};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

fn obj(v: JsonValue) -> JsonObject {
  v.as_object().cloned().expect("object literal")
}

fn truth(input: &JsonObject) -> &'static str {
  let text = input.get("text").and_then(JsonValue::as_str).unwrap_or_default();
  if text.starts_with("good") {
    "positive"
  } else {
    "negative"
  }
}

fn wrong(input: &JsonObject) -> &'static str {
  if truth(input) == "positive" {
    "negative"
  } else {
    "positive"
  }
}

/// Job explícito con `n` ejemplos alternando positivo y negativo.
fn pool_request(n: usize) -> CreateJobRequest {
  let pairs = (0..n).map(|i| {
                      let text = if i % 2 == 0 { format!("good {}", i) } else { format!("bad {}", i) };
                      let input = obj(json!({ "text": text }));
                      let output = obj(json!({ "sentiment": truth(&input) }));
                      (input, output)
                    })
                    .collect();
  CreateJobRequest::named("pool").with_instruction("classify sentiment")
                                 .with_example_pairs(pairs)
                                 .explicit()
}

fn settings() -> ProgramSettings {
  ProgramSettings { total_sample_size: 0,
                    test_size: 2,
                    runs_per_input: 2,
                    max_few_shot_size: 4,
                    ..ProgramSettings::default() }
}

/// Acierta sólo cuando el prompt lleva exactamente los ejemplos que
/// `correct` acepta.
fn by_example_count(correct: fn(usize) -> bool) -> FnEngineFactory {
  FnEngineFactory::new(move |_, template, input| match template {
    PromptTemplate::Job(prompt) => {
      let label = if correct(prompt.examples.len()) { truth(input) } else { wrong(input) };
      Ok(Some(obj(json!({ "sentiment": label }))))
    }
    PromptTemplate::Builtin(_) => Ok(None),
  })
}

#[test]
fn explicit_accuracy_is_fraction_of_exact_matches() {
  let ideal = obj(json!({"sentiment": "positive"}));
  let outs = vec![ideal.clone(), obj(json!({"sentiment": "negative"})), ideal.clone()];
  assert!((explicit_accuracy(&outs, &ideal) - 2.0 / 3.0).abs() < 1e-12);
}

#[tokio::test]
async fn evaluation_logs_one_event_per_sample_and_one_per_run() {
  let factory = FnEngineFactory::new(|_, _, _| Ok(Some(obj(json!({"sentiment": "positive"})))));
  let manager = JobManager::new(Arc::new(InMemoryJobRepository::new()), Arc::new(factory.clone()), settings());
  let mut job = manager.create_job(pool_request(2)).await.expect("create");
  let records = job.example_records.clone();

  let engine = EvaluationEngine::new(Arc::new(factory), 3, 4);
  let metrics = engine.evaluate(&mut job, &records, &JobSetting::default()).await.expect("evaluate");
  assert!((metrics.accuracy - 0.5).abs() < 1e-12);
  assert_eq!(metrics.num_runs, 3.0);

  let types: Vec<EventType> = job.event_log.iter().map(|e| e.event_type).collect();
  assert_eq!(types,
             vec![EventType::SampleEvaluation, EventType::SampleEvaluation, EventType::EvaluationRun]);
  let run = &job.event_log[2];
  assert_eq!(run.example_id.as_ref().map(|r| r.ids().len()), Some(2));
}

#[tokio::test]
async fn implicit_evaluation_asks_the_engine_to_judge() {
  let factory = FnEngineFactory::new(|_, template, input| match template {
                  PromptTemplate::Job(_) => Ok(Some(obj(json!({"sentiment": "positive"})))),
                  PromptTemplate::Builtin(BuiltinTemplate::MatchResponse) => {
                    let choice = if input["output"] == input["ideal_output"] { "C" } else { "D" };
                    Ok(Some(obj(json!({"reasoning": "comparado", "choice": choice}))))
                  }
                  PromptTemplate::Builtin(_) => Ok(None),
                });
  let mut job: JobRecord = job_workflow::factory::job_factory(pool_request(2)).expect("job");
  job.is_explicit = false;
  let records = job.example_records.clone();
  let engine = EvaluationEngine::new(Arc::new(factory), 2, 2);
  let metrics = engine.evaluate(&mut job, &records, &JobSetting::default()).await.expect("evaluate");
  assert!((metrics.accuracy - 0.5).abs() < 1e-12);
}

#[tokio::test]
async fn evaluating_nothing_is_a_validation_error() {
  let factory = FnEngineFactory::new(|_, _, _| Ok(None));
  let mut job = job_workflow::factory::job_factory(pool_request(1)).expect("job");
  let engine = EvaluationEngine::new(Arc::new(factory), 1, 1);
  assert!(engine.evaluate(&mut job, &[], &JobSetting::default()).await.is_err());
}

#[tokio::test]
async fn example_search_never_regresses_and_stops_at_the_size_bound() {
  let manager = JobManager::new(Arc::new(InMemoryJobRepository::new()), Arc::new(by_example_count(|n| n >= 2)), settings());
  let mut job = manager.create_job(pool_request(8)).await.expect("create");

  let search = manager.optimize_examples(&mut job).await.expect("optimize");
  assert_eq!(search.history, vec![0.0, 1.0, 1.0]);
  assert!(search.history.windows(2).all(|w| w[0] <= w[1]));
  let best_ids = search.best_setting.example_ids.clone().expect("ids");
  assert_eq!(best_ids.len(), 3);
  assert!(best_ids.iter().all(|id| !search.test_set_ids.contains(id)));
  assert_eq!(search.best_metrics.map(|m| m.accuracy), Some(1.0));
  // no se promueve nada al job
  assert_eq!(job.version, 0);
  assert_eq!(job.pinned_example_ids(), None);
}

#[tokio::test]
async fn example_search_stops_as_soon_as_the_metric_drops() {
  let manager = JobManager::new(Arc::new(InMemoryJobRepository::new()), Arc::new(by_example_count(|n| n == 1)), settings());
  let mut job = manager.create_job(pool_request(8)).await.expect("create");

  let search = manager.optimize_examples(&mut job).await.expect("optimize");
  assert_eq!(search.history, vec![1.0]);
  assert_eq!(search.best_setting.example_ids.map(|ids| ids.len()), Some(1));
  // candidatos de tamaño 1 (6) y de tamaño 2 (5)
  assert_eq!(search.results.len(), 11);
}

#[tokio::test]
async fn example_search_without_early_stopping_keeps_the_best_size() {
  let settings = ProgramSettings { early_stopping: false,
                                   ..settings() };
  let manager = JobManager::new(Arc::new(InMemoryJobRepository::new()), Arc::new(by_example_count(|n| n == 1)), settings);
  let mut job = manager.create_job(pool_request(8)).await.expect("create");

  let search = manager.optimize_examples(&mut job).await.expect("optimize");
  assert_eq!(search.history, vec![1.0, 1.0, 1.0]);
  assert_eq!(search.best_setting.example_ids.map(|ids| ids.len()), Some(1));
  assert_eq!(search.best_metrics.map(|m| m.accuracy), Some(1.0));
  // tamaños 1 (6), 2 (5) y 3 (4)
  assert_eq!(search.results.len(), 15);
}

#[tokio::test]
async fn instruction_search_picks_the_best_candidate_and_apply_promotes_it() {
  let factory = FnEngineFactory::new(|_, template, input| match template {
                  PromptTemplate::Job(prompt) => {
                    let label = if prompt.instruction.as_deref() == Some("be precise") { truth(input) } else { wrong(input) };
                    Ok(Some(obj(json!({ "sentiment": label }))))
                  }
                  PromptTemplate::Builtin(BuiltinTemplate::InstructionVariants) => {
                    Ok(Some(obj(json!({"instructions": ["be vague", "be precise", "be precise"]}))))
                  }
                  PromptTemplate::Builtin(_) => Ok(None),
                });
  let manager = JobManager::new(Arc::new(InMemoryJobRepository::new()), Arc::new(factory), settings());
  let mut job = manager.create_job(pool_request(8)).await.expect("create");

  let search = manager.optimize_instruction(&mut job, 3).await.expect("optimize");
  assert_eq!(search.results.len(), 3);
  assert_eq!(search.best_setting.instruction.as_deref(), Some("be precise"));
  assert_eq!(search.best_metrics.accuracy, 1.0);
  // los ejemplos del prompt quedan fuera del conjunto de prueba
  let prompt_ids = search.best_setting.example_ids.clone().expect("ids");
  assert_eq!(prompt_ids.len(), 3);
  assert!(prompt_ids.iter().all(|id| !search.test_set_ids.contains(id)));
  // con selección por fiabilidad (todas iguales) se respeta el orden del pool
  let ids: Vec<String> = job.example_records.iter().map(|r| r.idx.clone()).collect();
  assert_eq!(search.test_set_ids, ids[..5].to_vec());
  assert_eq!(prompt_ids, ids[5..].to_vec());
  assert_eq!(job.instruction.as_deref(), Some("classify sentiment"));

  let version = manager.apply_setting(&mut job, &search.best_setting, Some(&search.best_metrics)).expect("apply");
  assert_eq!(version, 1);
  let stored = manager.get_job(&JobLookup::Idx(job.idx.clone())).expect("stored");
  assert_eq!(stored.instruction.as_deref(), Some("be precise"));
  assert_eq!(stored.version_history.len(), 1);
  // el registro sigue a la instrucción nueva
  assert_eq!(manager.get_job(&JobLookup::IoHash(stored.io_hash())).expect("by hash").idx, job.idx);
}
