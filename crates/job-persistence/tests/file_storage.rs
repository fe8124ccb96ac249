use job_domain::{DomainStubs, Event, EventType, JobLookup, JobRepository, JobSetting, JsonObject};
use job_persistence::{FileJobStorage, FileLogStore};
use job_log::LogRepository;
use serde_json::json;
use std::fs;

fn obj(v: serde_json::Value) -> JsonObject {
  v.as_object().cloned().expect("object literal")
}

#[test]
fn round_trip_preserves_job_and_drains_logs() {
  let dir = tempfile::tempdir().expect("tempdir");
  let storage = FileJobStorage::new(dir.path()).expect("storage");
  let mut job = DomainStubs::sample_job();
  job.log_generation(&obj(json!({"text": "nice"})), &obj(json!({"sentiment": "positive"})), json!({}), &JobSetting::default());
  job.log_event(Event::new(EventType::JobUpdate));

  storage.register_keys(&job.idx, &["sentiment".to_string(), job.io_hash()]).expect("register");
  storage.store_job(&mut job).expect("store");
  assert!(job.event_log.is_empty());
  assert!(job.generation_log.is_empty());

  let job_dir = dir.path().join(&job.idx);
  for file in ["metadata.json", "examples.jsonl", "version_history.jsonl", "event_log.jsonl", "generation_log.jsonl"] {
    assert!(job_dir.join(file).exists(), "missing {}", file);
  }
  assert!(dir.path().join("job_register.json").exists());

  let loaded = storage.get_job(&JobLookup::Name("sentiment".into())).expect("load by name");
  assert_eq!(loaded.job_name, job.job_name);
  assert_eq!(loaded.instruction, job.instruction);
  assert_eq!(loaded.example_records, job.example_records);
  assert_eq!(loaded.input_model, job.input_model);
  assert_eq!(loaded.output_model, job.output_model);
  assert!(loaded.event_log.is_empty());
  assert_eq!(storage.load_event_log(&job.idx).expect("events").len(), 2);
}

#[test]
fn reflushing_persisted_events_does_not_duplicate_lines() {
  let dir = tempfile::tempdir().expect("tempdir");
  let logs = FileLogStore::new(dir.path());
  let first = Event::new(EventType::Generation);
  let second = Event::new(EventType::SampleEvaluation);

  assert_eq!(logs.append_events("job", &[first.clone()]).expect("append"), 1);
  assert_eq!(logs.append_events("job", &[first.clone(), second.clone()]).expect("append"), 1);

  let text = fs::read_to_string(dir.path().join("job").join("event_log.jsonl")).expect("read file");
  assert_eq!(text.lines().count(), 2);
  let ids: Vec<String> = logs.read_events("job").expect("read").into_iter().map(|e| e.event_id).collect();
  assert_eq!(ids, vec![first.event_id, second.event_id]);
}

#[test]
fn event_lines_use_scalar_encodings() {
  let dir = tempfile::tempdir().expect("tempdir");
  let logs = FileLogStore::new(dir.path());
  logs.append_events("job", &[Event::new(EventType::JobCreation)]).expect("append");
  let line = fs::read_to_string(dir.path().join("job").join("event_log.jsonl")).expect("read");
  let value: serde_json::Value = serde_json::from_str(line.trim()).expect("json line");
  assert_eq!(value["event_type"], json!("job_creation"));
  assert!(value["event_id"].as_str().is_some_and(|id| id.chars().all(|c| c.is_ascii_hexdigit())));
  assert!(value["timestamp"].is_string());
}

#[test]
fn delete_job_cleans_directory_and_registry() {
  let dir = tempfile::tempdir().expect("tempdir");
  let storage = FileJobStorage::new(dir.path()).expect("storage");
  let mut job = DomainStubs::sample_job();
  storage.register_keys(&job.idx, &["sentiment".to_string(), job.io_hash()]).expect("register");
  storage.store_job(&mut job).expect("store");
  assert_eq!(storage.list_job_ids().expect("list"), vec![job.idx.clone()]);

  storage.delete_job(&job.idx).expect("delete");
  assert!(!dir.path().join(&job.idx).exists());
  assert!(storage.registry().expect("registry").is_empty());
  assert!(storage.list_job_ids().expect("list").is_empty());
}

#[test]
fn job_ids_with_path_components_are_rejected() {
  let dir = tempfile::tempdir().expect("tempdir");
  let base = dir.path().join("jobs");
  let storage = FileJobStorage::new(&base).expect("storage");
  let mut job = DomainStubs::sample_job();
  job.idx = "../escape".to_string();

  assert!(storage.store_job(&mut job).is_err());
  assert!(!dir.path().join("escape").exists());
  assert!(storage.load_job("a/b").is_err());
  assert!(storage.remove_job_data("..").is_err());
  assert!(storage.load_event_log("../escape").is_err());

  let logs = FileLogStore::new(&base);
  assert!(logs.append_events("..\\escape", &[Event::new(EventType::JobCreation)]).is_err());
  assert!(logs.read_events("").is_err());
}
