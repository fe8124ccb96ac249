use crate::example_record::ExampleRecord;
use crate::io_model::{FieldSpec, FieldType, IoModel};
use crate::job_record::JobRecord;
use serde_json::json;

/// Datos de ejemplo para pruebas y demos.
pub struct DomainStubs;

impl DomainStubs {
  /// Esquema de clasificación de sentimiento (`text` -> `sentiment`).
  pub fn sentiment_models() -> (IoModel, IoModel) {
    let input = IoModel { fields: vec![FieldSpec::new("text", FieldType::String)] };
    let output = IoModel { fields: vec![FieldSpec::new("sentiment", FieldType::String).with_options(&["positive",
                                                                                                      "negative"])] };
    (input, output)
  }

  /// Job de sentimiento con dos ejemplos sembrados, sin persistir.
  pub fn sample_job() -> JobRecord {
    let (input, output) = Self::sentiment_models();
    let mut job = JobRecord::new(Some("sentiment".to_string()), input, output, Some("classify sentiment".to_string()));
    for (text, label) in [("I love it", "positive"), ("This is awful", "negative")] {
      let (Some(i), Some(o)) = (json!({ "text": text }).as_object().cloned(), json!({ "sentiment": label }).as_object().cloned())
      else {
        continue;
      };
      job.add_example(ExampleRecord::seed(i, o));
    }
    job.event_log.clear();
    job
  }
}
