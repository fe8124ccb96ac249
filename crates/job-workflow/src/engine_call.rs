// Helpers para llamadas únicas al motor con plantillas fijas.
use crate::errors::{Result, WorkflowError};
use llm_providers::{BuiltinTemplate, EngineFactory, EngineOutput, JsonObject, PromptTemplate};
use serde_json::Value as JsonValue;

pub(crate) async fn run_builtin(factory: &dyn EngineFactory, template: BuiltinTemplate, input: JsonObject) -> Result<EngineOutput> {
  let engine = factory.from_template(&PromptTemplate::Builtin(template))?;
  engine.run(&input)
        .await?
        .ok_or_else(|| WorkflowError::EngineOutput(format!("sin salida para {:?}", template)))
}

pub(crate) fn str_field(output: &JsonObject, key: &str) -> Result<String> {
  match output.get(key) {
    Some(JsonValue::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
    _ => Err(WorkflowError::EngineOutput(format!("falta el texto '{}'", key))),
  }
}

pub(crate) fn str_list(output: &JsonObject, key: &str) -> Result<Vec<String>> {
  let items = output.get(key)
                    .and_then(JsonValue::as_array)
                    .ok_or_else(|| WorkflowError::EngineOutput(format!("falta la lista '{}'", key)))?;
  Ok(items.iter()
          .filter_map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string))
          .collect())
}

/// Construye un objeto JSON a partir de pares clave/valor.
pub(crate) fn object<const N: usize>(pairs: [(&str, JsonValue); N]) -> JsonObject {
  pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}
