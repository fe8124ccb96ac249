// job_record.rs
// Raíz de agregado: esquemas, instrucción, ejemplos, historial de versiones
// y bitácoras en memoria pendientes de persistir.
use crate::example_record::{Example, ExampleRecord};
use crate::io_model::{io_hash, IoModel};
use crate::DomainError;
use chrono::Utc;
use job_log::{Event, EventType, ExampleRef, GenerationEntry};
use llm_providers::{JobPrompt, JsonObject, PromptExample};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

/// Variante de ejecución de un job: instrucción y/o subconjunto de ejemplos
/// distintos a los actuales.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobSetting {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub instruction: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub example_ids: Option<Vec<String>>,
}

impl JobSetting {
  pub fn with_instruction(instruction: impl Into<String>) -> Self {
    Self { instruction: Some(instruction.into()),
           example_ids: None }
  }

  pub fn with_examples(instruction: Option<String>, example_ids: Vec<String>) -> Self {
    Self { instruction,
           example_ids: Some(example_ids) }
  }

  pub fn to_json(&self) -> JsonValue {
    serde_json::to_value(self).unwrap_or(JsonValue::Null)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
  pub idx: String,
  #[serde(default)]
  pub job_name: Option<String>,
  #[serde(default)]
  pub version: u32,
  #[serde(default)]
  pub is_explicit: bool,
  #[serde(default)]
  pub config: JsonValue,
  pub input_model: IoModel,
  pub output_model: IoModel,
  #[serde(default)]
  pub example_records: Vec<ExampleRecord>,
  #[serde(default)]
  pub instruction: Option<String>,
  #[serde(default)]
  pub version_history: Vec<JsonValue>,
  #[serde(default)]
  pub generation_log: Vec<GenerationEntry>,
  #[serde(default)]
  pub event_log: Vec<Event>,
}

impl JobRecord {
  pub fn new(job_name: Option<String>, input_model: IoModel, output_model: IoModel, instruction: Option<String>) -> Self {
    Self { idx: Uuid::new_v4().simple().to_string(),
           job_name,
           version: 0,
           is_explicit: false,
           config: json!({}),
           input_model,
           output_model,
           example_records: Vec::new(),
           instruction,
           version_history: Vec::new(),
           generation_log: Vec::new(),
           event_log: Vec::new() }
  }

  pub fn io_hash(&self) -> String {
    io_hash(&self.input_model, &self.output_model, self.instruction.as_deref())
  }

  pub fn log_event(&mut self, event: Event) {
    self.event_log.push(event);
  }

  pub fn record_by_input(&self, input: &JsonObject) -> Option<&ExampleRecord> {
    self.example_records.iter().find(|r| r.input() == input)
  }

  pub fn record(&self, example_id: &str) -> Option<&ExampleRecord> {
    self.example_records.iter().find(|r| r.idx == example_id)
  }

  pub fn record_mut(&mut self, example_id: &str) -> Option<&mut ExampleRecord> {
    self.example_records.iter_mut().find(|r| r.idx == example_id)
  }

  /// Registra una generación: un evento `generation` (con `example_id` si la
  /// entrada ya es un ejemplo) y su par entrada/salida enlazado.
  pub fn log_generation(&mut self, input: &JsonObject, output: &JsonObject, metrics: JsonValue, setting: &JobSetting) -> Event {
    let example_id = self.record_by_input(input).map(|r| r.idx.clone());
    let event = Event::from_generation(metrics, setting.to_json(), example_id).with_version(self.version);
    self.generation_log.push(GenerationEntry { event_id: event.event_id.clone(),
                                               input: JsonValue::Object(input.clone()),
                                               output: JsonValue::Object(output.clone()) });
    self.log_event(event.clone());
    event
  }

  /// Añade un ejemplo si su entrada no existe todavía. Un duplicado se ignora
  /// sin registrar evento; devuelve si se añadió.
  pub fn add_example(&mut self, record: ExampleRecord) -> bool {
    if self.record_by_input(record.input()).is_some() {
      log::debug!("Ejemplo duplicado ignorado en job {}", self.idx);
      return false;
    }
    let mut event = Event::new(EventType::ExampleAdd).with_example(ExampleRef::One(record.idx.clone()), Some(record.version))
                                                     .with_version(self.version);
    if let Some(gen) = &record.gen_event_id {
      event = event.with_ref(gen.clone());
    }
    self.example_records.push(record);
    self.log_event(event);
    true
  }

  /// Ejemplos por id (en orden del pool); `None` devuelve todos.
  pub fn get_examples(&self, example_ids: Option<&[String]>) -> Vec<Example> {
    self.example_records
        .iter()
        .filter(|r| example_ids.map_or(true, |ids| ids.iter().any(|id| *id == r.idx)))
        .map(|r| r.example.clone())
        .collect()
  }

  /// Ids de ejemplos fijados por la última versión explícita, si hay.
  pub fn pinned_example_ids(&self) -> Option<Vec<String>> {
    self.config
        .get("example_ids")
        .and_then(|v| serde_json::from_value::<Vec<String>>(v.clone()).ok())
  }

  /// Prompt del job para una variante. Lo que la variante no fija se toma
  /// del job; sin ejemplos fijados se usan todos los del pool.
  pub fn prompt_for(&self, setting: &JobSetting) -> JobPrompt {
    let ids = setting.example_ids.clone().or_else(|| self.pinned_example_ids());
    let examples = self.get_examples(ids.as_deref()).iter().map(PromptExample::from).collect();
    JobPrompt { instruction: setting.instruction.clone().or_else(|| self.instruction.clone()),
                input_schema: self.input_model.template_schema(),
                output_schema: self.output_model.template_schema(),
                input_keys: self.input_model.keys(),
                output_keys: self.output_model.keys(),
                examples }
  }

  /// Promueve explícitamente una variante a nueva versión del job. Es la
  /// única vía por la que cambia `version`.
  pub fn add_version(&mut self, setting: &JobSetting, metrics: Option<JsonValue>) -> Result<u32, DomainError> {
    if let Some(ids) = &setting.example_ids {
      if let Some(missing) = ids.iter().find(|id| self.record(id).is_none()) {
        return Err(DomainError::NotFound(format!("ejemplo {} en job {}", missing, self.idx)));
      }
    }
    self.version += 1;
    if let Some(instr) = &setting.instruction {
      self.instruction = Some(instr.clone());
    }
    if let Some(ids) = &setting.example_ids {
      if !self.config.is_object() {
        self.config = json!({});
      }
      self.config["example_ids"] = json!(ids);
    }
    self.version_history.push(json!({
      "version": self.version,
      "timestamp": Utc::now().to_rfc3339(),
      "instruction": self.instruction,
      "example_ids": self.pinned_example_ids(),
      "metrics": metrics,
    }));
    self.log_event(Event::new(EventType::JobUpdate).with_version(self.version).with_extra(setting.to_json()));
    Ok(self.version)
  }

  pub fn rollback(&mut self, version: u32) -> Result<(), DomainError> {
    Err(DomainError::Unsupported(format!("rollback a la versión {}", version)))
  }
}

/// Contenido de `metadata.json`: el job sin ejemplos, historial ni bitácoras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
  pub idx: String,
  pub job_name: Option<String>,
  pub version: u32,
  pub is_explicit: bool,
  pub config: JsonValue,
  pub input_model: IoModel,
  pub output_model: IoModel,
  pub instruction: Option<String>,
  pub io_hash: String,
}

impl JobMetadata {
  pub fn from_job(job: &JobRecord) -> Self {
    Self { idx: job.idx.clone(),
           job_name: job.job_name.clone(),
           version: job.version,
           is_explicit: job.is_explicit,
           config: job.config.clone(),
           input_model: job.input_model.clone(),
           output_model: job.output_model.clone(),
           instruction: job.instruction.clone(),
           io_hash: job.io_hash() }
  }

  pub fn into_job(self, example_records: Vec<ExampleRecord>, version_history: Vec<JsonValue>) -> JobRecord {
    JobRecord { idx: self.idx,
                job_name: self.job_name,
                version: self.version,
                is_explicit: self.is_explicit,
                config: self.config,
                input_model: self.input_model,
                output_model: self.output_model,
                example_records,
                instruction: self.instruction,
                version_history,
                generation_log: Vec::new(),
                event_log: Vec::new() }
  }
}
