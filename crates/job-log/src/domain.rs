// Archivo: domain.rs
// Propósito: tipos de registro de las bitácoras de un job (`Event`,
// `EventType`, `ExampleRef`, `GenerationEntry`). Son inmutables una vez
// creados y se serializan tal cual a JSONL.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

/// Genera un identificador único en formato hexadecimal plano.
pub fn new_event_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Tipo de acción que afectó al job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Generation,
    SampleEvaluation,
    EvaluationRun,
    ExampleAdd,
    ExampleRemove,
    ExampleUpdate,
    JobUpdate,
    JobCreation,
}

impl EventType {
    /// Valor escalar con el que se persiste el tipo.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Generation => "generation",
            EventType::SampleEvaluation => "sample_evaluation",
            EventType::EvaluationRun => "evaluation_run",
            EventType::ExampleAdd => "example_add",
            EventType::ExampleRemove => "example_remove",
            EventType::ExampleUpdate => "example_update",
            EventType::JobUpdate => "job_update",
            EventType::JobCreation => "job_creation",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Referencia a uno o varios ejemplos desde un evento.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExampleRef {
    One(String),
    Many(Vec<String>),
}

impl ExampleRef {
    /// Ids referenciados como slice uniforme.
    pub fn ids(&self) -> Vec<&str> {
        match self {
            ExampleRef::One(id) => vec![id.as_str()],
            ExampleRef::Many(ids) => ids.iter().map(String::as_str).collect(),
        }
    }
}

/// Registro de una acción sobre un job. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    #[serde(default)]
    pub event_metrics: Option<JsonValue>,
    #[serde(default)]
    pub job_setting: Option<JsonValue>,
    #[serde(default)]
    pub job_version: Option<u32>,
    #[serde(default)]
    pub example_id: Option<ExampleRef>,
    #[serde(default)]
    pub example_version: Option<u32>,
    #[serde(default)]
    pub extra: Option<JsonValue>,
    #[serde(default)]
    pub ref_event_id: Option<String>,
}

impl Event {
    /// Crea un evento vacío del tipo indicado con id y timestamp nuevos.
    pub fn new(event_type: EventType) -> Self {
        Self { event_id: new_event_id(),
               timestamp: Utc::now(),
               event_type,
               event_metrics: None,
               job_setting: None,
               job_version: None,
               example_id: None,
               example_version: None,
               extra: None,
               ref_event_id: None }
    }

    /// Evento de generación con las métricas (ya fusionadas) de la llamada.
    pub fn from_generation(metrics: JsonValue, job_setting: JsonValue, example_id: Option<String>) -> Self {
        let mut ev = Self::new(EventType::Generation);
        ev.event_metrics = Some(metrics);
        ev.job_setting = Some(job_setting);
        ev.example_id = example_id.map(ExampleRef::One);
        ev
    }

    /// Evento con la métrica de un único ejemplo evaluado.
    pub fn from_sample_metric(metrics: JsonValue, job_setting: JsonValue, example_id: &str) -> Self {
        let mut ev = Self::new(EventType::SampleEvaluation);
        ev.event_metrics = Some(metrics);
        ev.job_setting = Some(job_setting);
        ev.example_id = Some(ExampleRef::One(example_id.to_string()));
        ev
    }

    /// Evento agregado de una corrida de evaluación completa.
    pub fn from_evaluation_metric(metrics: JsonValue, job_setting: JsonValue, example_ids: Vec<String>) -> Self {
        let mut ev = Self::new(EventType::EvaluationRun);
        ev.event_metrics = Some(metrics);
        ev.job_setting = Some(job_setting);
        ev.example_id = Some(ExampleRef::Many(example_ids));
        ev
    }

    pub fn with_version(mut self, job_version: u32) -> Self {
        self.job_version = Some(job_version);
        self
    }

    pub fn with_example(mut self, example_id: ExampleRef, example_version: Option<u32>) -> Self {
        self.example_id = Some(example_id);
        self.example_version = example_version;
        self
    }

    pub fn with_extra(mut self, extra: JsonValue) -> Self {
        self.extra = Some(extra);
        self
    }

    pub fn with_ref(mut self, ref_event_id: impl Into<String>) -> Self {
        self.ref_event_id = Some(ref_event_id.into());
        self
    }
}

/// Par entrada/salida producido por una generación, enlazado a su evento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationEntry {
    pub event_id: String,
    pub input: JsonValue,
    pub output: JsonValue,
}

/// Registros que se pueden deduplicar por `event_id`.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Event {
    fn key(&self) -> &str {
        &self.event_id
    }
}

impl Keyed for GenerationEntry {
    fn key(&self) -> &str {
        &self.event_id
    }
}
