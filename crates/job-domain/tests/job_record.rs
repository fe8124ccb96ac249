use job_domain::{DataType, DomainError, DomainStubs, EventType, ExampleRecord, ExampleRef, JobSetting, JsonObject,
                 VerificationType};
use serde_json::json;

fn obj(v: serde_json::Value) -> JsonObject {
  v.as_object().cloned().expect("object literal")
}

#[test]
fn duplicate_input_is_a_silent_noop() {
  let mut job = DomainStubs::sample_job();
  let before = job.example_records.len();

  let added = job.add_example(ExampleRecord::new(obj(json!({"text": "I love it"})), obj(json!({"sentiment": "negative"}))));
  assert!(!added);
  assert_eq!(job.example_records.len(), before);
  assert!(job.event_log.is_empty(), "no event for duplicate input");

  let added = job.add_example(ExampleRecord::new(obj(json!({"text": "meh"})), obj(json!({"sentiment": "negative"}))));
  assert!(added);
  assert_eq!(job.example_records.len(), before + 1);
  assert_eq!(job.event_log.len(), 1);
  assert_eq!(job.event_log[0].event_type, EventType::ExampleAdd);
}

#[test]
fn reliability_score_increases_with_verification_rank() {
  let kinds = [VerificationType::SingleVote,
               VerificationType::MajorityVote,
               VerificationType::MajorityGrade,
               VerificationType::UsageVerified,
               VerificationType::HumanVerified];
  let scores: Vec<f64> = kinds.iter()
                              .map(|k| {
                                ExampleRecord::new(JsonObject::new(), JsonObject::new()).with_provenance(None,
                                                                                                        Some(*k),
                                                                                                        Some(1.0),
                                                                                                        DataType::Synthetic)
                                                                                       .reliability_score()
                              })
                              .collect();
  assert!(scores.windows(2).all(|w| w[0] < w[1]), "scores: {:?}", scores);

  let untyped = ExampleRecord::new(JsonObject::new(), JsonObject::new());
  assert_eq!(untyped.reliability_score(), 0.0);
}

#[test]
fn verification_type_serializes_as_rank() {
  let rec = ExampleRecord::seed(obj(json!({"a": 1})), obj(json!({"b": 2})));
  let value = serde_json::to_value(&rec).expect("serialize");
  assert_eq!(value["verification_type"], json!(5));
  assert_eq!(value["data_type"], json!("real"));
  assert_eq!(value["gen_event_id"], json!("genesis"));

  let bad = json!({"idx": "x", "example": {"input": {}, "output": {}}, "verification_type": 9});
  assert!(serde_json::from_value::<ExampleRecord>(bad).is_err());
}

#[test]
fn generation_references_existing_example_and_version() {
  let mut job = DomainStubs::sample_job();
  let seed_id = job.example_records[0].idx.clone();

  let ev = job.log_generation(&obj(json!({"text": "I love it"})),
                              &obj(json!({"sentiment": "positive"})),
                              json!({"execution_time": 0.1}),
                              &JobSetting::default());
  assert_eq!(ev.example_id, Some(ExampleRef::One(seed_id)));
  assert_eq!(ev.job_version, Some(0));

  let ev = job.log_generation(&obj(json!({"text": "new"})), &obj(json!({"sentiment": "positive"})), json!({}), &JobSetting::default());
  assert_eq!(ev.example_id, None);
  assert_eq!(job.generation_log.len(), 2);
  assert_eq!(job.generation_log[1].event_id, ev.event_id);
}

#[test]
fn revise_moves_previous_output_to_history() {
  let mut rec = ExampleRecord::new(obj(json!({"q": 1})), obj(json!({"a": "x"})));
  rec.revise(obj(json!({"a": "y"})), Some(VerificationType::HumanVerified), Some(1.0));
  assert_eq!(rec.version, 1);
  assert_eq!(rec.output()["a"], json!("y"));
  assert_eq!(rec.version_history[&0].output["a"], json!("x"));
}

#[test]
fn add_version_is_the_only_version_bump() {
  let mut job = DomainStubs::sample_job();
  let ids = vec![job.example_records[1].idx.clone()];
  let v = job.add_version(&JobSetting::with_examples(Some("label the text".into()), ids.clone()), None)
             .expect("add_version");
  assert_eq!(v, 1);
  assert_eq!(job.instruction.as_deref(), Some("label the text"));
  assert_eq!(job.pinned_example_ids(), Some(ids));
  assert_eq!(job.version_history.len(), 1);

  // El prompt por defecto usa los ejemplos fijados
  let prompt = job.prompt_for(&JobSetting::default());
  assert_eq!(prompt.examples.len(), 1);
  assert_eq!(prompt.output_keys, vec!["sentiment"]);

  let err = job.add_version(&JobSetting::with_examples(None, vec!["nope".into()]), None);
  assert!(matches!(err, Err(DomainError::NotFound(_))));
  assert!(matches!(job.rollback(0), Err(DomainError::Unsupported(_))));
}
