// Clean example: in-memory repository and a keyword engine, runs locally
use job_domain::{DomainStubs, InMemoryJobRepository, JsonObject};
use job_workflow::{CreateJobRequest, JobManager, ProgramSettings};
use llm_providers::stubs::FnEngineFactory;
use llm_providers::PromptTemplate;
use serde_json::json;
use std::sync::Arc;

fn obj(v: serde_json::Value) -> JsonObject {
    v.as_object().cloned().unwrap_or_default()
}

#[tokio::main]
async fn main() {
    // stand-in engine so the example runs without a model provider
    let engine = FnEngineFactory::new(|_, template, input| match template {
                     PromptTemplate::Job(_) => {
                         let text = input.get("text").and_then(|v| v.as_str()).unwrap_or_default();
                         let label = if text.contains("love") { "positive" } else { "negative" };
                         Ok(Some(obj(json!({ "sentiment": label }))))
                     }
                     PromptTemplate::Builtin(_) => Ok(None),
                 });
    let manager = JobManager::new(Arc::new(InMemoryJobRepository::new()),
                                  Arc::new(engine),
                                  ProgramSettings::default());

    let (input, output) = DomainStubs::sentiment_models();
    let request = CreateJobRequest::named("sentiment").with_models(input, output)
                                                      .with_instruction("classify sentiment")
                                                      .with_example_pairs(vec![(obj(json!({"text": "I love it"})),
                                                                                obj(json!({"sentiment": "positive"})))]);
    let mut job = manager.create_job(request).await.expect("create job");
    println!("Created job id={} name={:?}", job.idx, job.job_name);

    let (out, metrics) = manager.generate_output(&mut job, &obj(json!({"text": "we love rust"})))
                                .await
                                .expect("generate");
    println!("Output: {} (runs={})", serde_json::Value::Object(out), metrics.num_runs);

    for event in manager.get_event_log(&job.idx).expect("events") {
        println!("{} {} v{:?}", event.timestamp, event.event_type, event.job_version);
    }
}
