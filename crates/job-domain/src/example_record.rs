// example_record.rs
use crate::DomainError;
use llm_providers::{JsonObject, PromptExample};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Cómo se verificó la salida de un ejemplo. El rango (1..5) es también el
/// peso usado en `reliability_score`; se persiste como entero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum VerificationType {
  SingleVote = 1,
  MajorityVote = 2,
  MajorityGrade = 3,
  UsageVerified = 4,
  HumanVerified = 5,
}

impl VerificationType {
  pub fn weight(&self) -> f64 {
    f64::from(u8::from(*self))
  }
}

impl From<VerificationType> for u8 {
  fn from(v: VerificationType) -> Self {
    v as u8
  }
}

impl TryFrom<u8> for VerificationType {
  type Error = DomainError;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      1 => Ok(Self::SingleVote),
      2 => Ok(Self::MajorityVote),
      3 => Ok(Self::MajorityGrade),
      4 => Ok(Self::UsageVerified),
      5 => Ok(Self::HumanVerified),
      other => Err(DomainError::ValidationError(format!("Tipo de verificación inválido: {}", other))),
    }
  }
}

/// Origen del dato de un ejemplo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DataType {
  #[default]
  #[serde(rename = "synthetic")]
  Synthetic,
  #[serde(rename = "semi-synthetic")]
  SemiSynthetic,
  #[serde(rename = "real")]
  Real,
}

/// Par (entrada, salida).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
  pub input: JsonObject,
  pub output: JsonObject,
}

impl From<&Example> for PromptExample {
  fn from(e: &Example) -> Self {
    PromptExample { input: e.input.clone(),
                    output: e.output.clone() }
  }
}

/// Ejemplo con procedencia y versionado propio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleRecord {
  pub idx: String,
  pub example: Example,
  #[serde(default)]
  pub version: u32,
  #[serde(default)]
  pub version_history: BTreeMap<u32, Example>,
  #[serde(default)]
  pub gen_event_id: Option<String>,
  #[serde(default)]
  pub verification_type: Option<VerificationType>,
  #[serde(default)]
  pub reliability: Option<f64>,
  #[serde(default)]
  pub data_type: DataType,
}

impl ExampleRecord {
  pub fn new(input: JsonObject, output: JsonObject) -> Self {
    Self { idx: Uuid::new_v4().simple().to_string(),
           example: Example { input, output },
           version: 0,
           version_history: BTreeMap::new(),
           gen_event_id: None,
           verification_type: None,
           reliability: None,
           data_type: DataType::Synthetic }
  }

  /// Ejemplo sembrado por una persona: `genesis`, verificado y real.
  pub fn seed(input: JsonObject, output: JsonObject) -> Self {
    Self { gen_event_id: Some("genesis".to_string()),
           verification_type: Some(VerificationType::HumanVerified),
           reliability: Some(1.0),
           data_type: DataType::Real,
           ..Self::new(input, output) }
  }

  pub fn with_provenance(mut self,
                         gen_event_id: Option<String>,
                         verification_type: Option<VerificationType>,
                         reliability: Option<f64>,
                         data_type: DataType)
                         -> Self {
    self.gen_event_id = gen_event_id;
    self.verification_type = verification_type;
    self.reliability = reliability;
    self.data_type = data_type;
    self
  }

  pub fn input(&self) -> &JsonObject {
    &self.example.input
  }

  pub fn output(&self) -> &JsonObject {
    &self.example.output
  }

  /// `reliability × peso del tipo de verificación`. Sin `reliability` se
  /// asume 1.0; sin tipo de verificación el peso es 0.
  pub fn reliability_score(&self) -> f64 {
    let weight = self.verification_type.map(|v| v.weight()).unwrap_or(0.0);
    self.reliability.unwrap_or(1.0) * weight
  }

  /// Nueva revisión de la salida: la versión actual pasa al historial.
  pub fn revise(&mut self, output: JsonObject, verification_type: Option<VerificationType>, reliability: Option<f64>) {
    let previous = Example { input: self.example.input.clone(),
                             output: std::mem::replace(&mut self.example.output, output) };
    self.version_history.insert(self.version, previous);
    self.version += 1;
    self.verification_type = verification_type;
    self.reliability = reliability;
  }
}

impl fmt::Display for ExampleRecord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f,
           "ExampleRecord(idx: {}, v{}, score: {:.2})",
           self.idx,
           self.version,
           self.reliability_score())
  }
}
