use job_domain::{DataType, DomainStubs, EventType, JobRecord, JobRepository, JsonObject, VerificationType};
use job_persistence::FileJobStorage;
use job_workflow::generator::HumanVerifier;
use job_workflow::{CreateJobRequest, JobManager, Program, ProgramSettings, PromptType, WorkflowError};
use llm_providers::stubs::FnEngineFactory;
use llm_providers::{BuiltinTemplate, PromptTemplate};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

fn obj(v: JsonValue) -> JsonObject {
  v.as_object().cloned().expect("object literal")
}

fn engine() -> FnEngineFactory {
  FnEngineFactory::new(|_, template, _| match template {
    PromptTemplate::Job(_) => Ok(Some(obj(json!({"sentiment": "positive"})))),
    PromptTemplate::Builtin(_) => Ok(Some(obj(json!({"reasoning": "r", "instruction": "classify sentiment"})))),
  })
}

fn few_shot() -> ProgramSettings {
  ProgramSettings { program_type: PromptType::FewShot,
                    fr_optimization: false,
                    ..ProgramSettings::default() }
}

fn file_manager(dir: &std::path::Path, factory: &FnEngineFactory, settings: ProgramSettings) -> JobManager<FileJobStorage> {
  let repo = FileJobStorage::new(dir).expect("storage");
  JobManager::new(Arc::new(repo), Arc::new(factory.clone()), settings)
}

fn request() -> CreateJobRequest {
  let (input, output) = DomainStubs::sentiment_models();
  CreateJobRequest::default().with_models(input, output)
}

#[tokio::test]
async fn first_call_votes_and_keeps_the_pair_as_example() {
  let dir = tempfile::tempdir().expect("tempdir");
  let factory = engine();
  let mut program = Program::open(file_manager(dir.path(), &factory, few_shot()), "sentiment", request(), true)
    .await
    .expect("open");
  assert_eq!(program.job().instruction.as_deref(), Some("classify sentiment"));
  assert!(program.job().example_records.is_empty());

  let input = obj(json!({"text": "what a day"}));
  let calls = factory.calls();
  let (output, metrics) = program.call(&input).await.expect("call");
  assert_eq!(output["sentiment"], json!("positive"));
  assert_eq!(factory.calls() - calls, 5, "la primera llamada vota por consenso");
  assert_eq!(metrics.verification_type, Some(VerificationType::MajorityVote));

  let record = &program.job().example_records[0];
  assert_eq!(record.input(), &input);
  assert_eq!(record.data_type, DataType::SemiSynthetic);

  // la segunda llamada ya no es la primera ejecución
  let calls = factory.calls();
  program.call(&obj(json!({"text": "another"}))).await.expect("call");
  assert_eq!(factory.calls() - calls, 1);
  assert_eq!(program.job().example_records.len(), 1);

  let generations: Vec<_> = program.event_log()
                                   .expect("events")
                                   .into_iter()
                                   .filter(|e| e.event_type == EventType::Generation)
                                   .collect();
  assert_eq!(generations.len(), 2);
  assert_eq!(program.generation_log().expect("gens").len(), 2);
}

#[tokio::test]
async fn reopening_by_name_or_id_loads_the_stored_job() {
  let dir = tempfile::tempdir().expect("tempdir");
  let factory = engine();
  let mut program = Program::open(file_manager(dir.path(), &factory, few_shot()), "sentiment", request(), true)
    .await
    .expect("open");
  program.call(&obj(json!({"text": "hola"}))).await.expect("call");
  let idx = program.job().idx.clone();

  let by_name = Program::load(file_manager(dir.path(), &factory, few_shot()), "sentiment").expect("by name");
  assert_eq!(by_name.job().idx, idx);
  assert_eq!(by_name.job().example_records.len(), 1);

  let by_idx = Program::load(file_manager(dir.path(), &factory, few_shot()), &idx).expect("by idx");
  assert_eq!(by_idx.job().job_name.as_deref(), Some("sentiment"));

  let reopened = Program::open(file_manager(dir.path(), &factory, few_shot()), "sentiment", request(), true)
    .await
    .expect("reopen");
  assert_eq!(reopened.job().idx, idx);
  assert_eq!(by_idx.manager().repo().registry().expect("registry").len(), 3);
}

#[tokio::test]
async fn zero_shot_programs_never_vote_on_the_first_call() {
  let dir = tempfile::tempdir().expect("tempdir");
  let factory = engine();
  let mut program = Program::open(file_manager(dir.path(), &factory, ProgramSettings::default()), "zs", request(), false)
    .await
    .expect("open");
  let calls = factory.calls();
  program.call(&obj(json!({"text": "hola"}))).await.expect("call");
  assert_eq!(factory.calls() - calls, 1);
  assert!(program.job().example_records.is_empty());
}

/// Motor que sólo sabe proponer una entrada nueva: el pool nunca llega al
/// objetivo.
fn repeating_engine() -> FnEngineFactory {
  FnEngineFactory::new(|_, template, _| match template {
    PromptTemplate::Job(_) => Ok(Some(obj(json!({"sentiment": "positive"})))),
    PromptTemplate::Builtin(BuiltinTemplate::ExtendInputs) => Ok(Some(obj(json!({"outputs": [{"text": "same"}]})))),
    PromptTemplate::Builtin(_) => Ok(Some(obj(json!({"reasoning": "r", "instruction": "classify sentiment"})))),
  })
}

#[tokio::test]
async fn first_call_returns_its_output_when_the_pool_cannot_be_filled() {
  let dir = tempfile::tempdir().expect("tempdir");
  let factory = repeating_engine();
  let settings = ProgramSettings { program_type: PromptType::FewShot,
                                   ..ProgramSettings::default() };
  let mut program = Program::open(file_manager(dir.path(), &factory, settings.clone()), "sentiment", request(), true)
    .await
    .expect("open");

  let (output, _metrics) = program.call(&obj(json!({"text": "what a day"}))).await.expect("call");
  assert_eq!(output["sentiment"], json!("positive"));
  assert_eq!(program.job().example_records.len(), 2);

  let stored = Program::load(file_manager(dir.path(), &factory, settings), "sentiment").expect("load");
  assert_eq!(stored.job().example_records.len(), 2);
}

struct AlwaysNeutral;

#[async_trait::async_trait]
impl HumanVerifier for AlwaysNeutral {
  async fn choose(&self, _job: &JobRecord, _input: &JsonObject, _candidates: &[JsonObject]) -> Result<JsonObject, WorkflowError> {
    Ok(obj(json!({"sentiment": "neutral"})))
  }
}

fn human_first_run() -> ProgramSettings {
  ProgramSettings { fr_human_verification: true,
                    ..few_shot() }
}

#[tokio::test]
async fn first_call_with_human_verification_uses_the_verifier() {
  let dir = tempfile::tempdir().expect("tempdir");
  let factory = engine();
  let mut program = Program::open(file_manager(dir.path(), &factory, human_first_run()), "sentiment", request(), true)
    .await
    .expect("open")
    .with_verifier(Arc::new(AlwaysNeutral));

  let calls = factory.calls();
  let (output, metrics) = program.call(&obj(json!({"text": "hmm"}))).await.expect("call");
  assert_eq!(output, obj(json!({"sentiment": "neutral"})));
  assert_eq!(factory.calls() - calls, 5);
  assert_eq!(metrics.verification_type, Some(VerificationType::HumanVerified));

  let record = &program.job().example_records[0];
  assert_eq!(record.verification_type, Some(VerificationType::HumanVerified));
  assert_eq!(record.reliability, Some(1.0));
  assert_eq!(record.data_type, DataType::SemiSynthetic);
}

#[tokio::test]
async fn human_verification_without_verifier_is_unsupported() {
  let dir = tempfile::tempdir().expect("tempdir");
  let factory = engine();
  let mut program = Program::open(file_manager(dir.path(), &factory, human_first_run()), "sentiment", request(), true)
    .await
    .expect("open");

  let err = program.call(&obj(json!({"text": "hmm"}))).await.expect_err("no verifier");
  assert!(matches!(err, WorkflowError::Unsupported(_)), "{:?}", err);
  assert!(program.job().example_records.is_empty());
}

#[test]
fn unknown_programs_fail_to_load() {
  let dir = tempfile::tempdir().expect("tempdir");
  let factory = engine();
  assert!(Program::load(file_manager(dir.path(), &factory, few_shot()), "nadie").is_err());
}
