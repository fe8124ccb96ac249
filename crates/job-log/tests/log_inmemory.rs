use job_log::{Event, EventType, ExampleRef, GenerationEntry, InMemoryLogRepository, LogRepository};
use serde_json::json;

#[test]
fn append_is_idempotent_by_event_id() {
    let repo = InMemoryLogRepository::new();
    let a = Event::new(EventType::Generation);
    let b = Event::new(EventType::JobUpdate);

    assert_eq!(repo.append_events("job", &[a.clone()]).expect("append a"), 1);
    // Re-flush de `a` junto con `b`: sólo `b` es nuevo
    assert_eq!(repo.append_events("job", &[a.clone(), b.clone()]).expect("append a+b"), 1);

    let stored = repo.read_events("job").expect("read");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].event_id, a.event_id);
    assert_eq!(stored[1].event_id, b.event_id);
}

#[test]
fn generations_and_events_are_independent_per_job() {
    let repo = InMemoryLogRepository::new();
    let entry = GenerationEntry { event_id: "e1".into(),
                                  input: json!({"text": "hola"}),
                                  output: json!({"label": "pos"}) };
    repo.append_generations("a", &[entry.clone(), entry.clone()]).expect("append");
    assert_eq!(repo.read_generations("a").expect("read a").len(), 1);
    assert!(repo.read_generations("b").expect("read b").is_empty());
    assert!(repo.read_events("a").expect("events a").is_empty());

    repo.delete_logs("a").expect("delete");
    assert!(repo.read_generations("a").expect("read after delete").is_empty());
}

#[test]
fn event_serializes_scalar_enum_and_example_refs() {
    let ev = Event::from_evaluation_metric(json!({"accuracy": 1.0}),
                                           json!({"instruction": "x"}),
                                           vec!["a".into(), "b".into()]).with_version(2);
    let value = serde_json::to_value(&ev).expect("serialize");
    assert_eq!(value["event_type"], json!("evaluation_run"));
    assert_eq!(value["example_id"], json!(["a", "b"]));
    assert_eq!(value["job_version"], json!(2));
    assert!(value["timestamp"].is_string());

    let single = Event::from_sample_metric(json!({}), json!({}), "ex-1");
    let back: Event = serde_json::from_str(&serde_json::to_string(&single).expect("ser")).expect("de");
    assert_eq!(back.example_id, Some(ExampleRef::One("ex-1".into())));
    assert_eq!(back.event_type, EventType::SampleEvaluation);
    assert_eq!(back.event_id.len(), 32);
}
