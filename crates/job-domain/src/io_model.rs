// io_model.rs
// Esquemas de entrada/salida de un job y el hash que identifica jobs
// semánticamente equivalentes.
use crate::DomainError;
use llm_providers::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
  String,
  Integer,
  Float,
  Boolean,
  List,
  Object,
}

impl FieldType {
  fn as_str(&self) -> &'static str {
    match self {
      FieldType::String => "str",
      FieldType::Integer => "int",
      FieldType::Float => "float",
      FieldType::Boolean => "bool",
      FieldType::List => "list",
      FieldType::Object => "dict",
    }
  }

  /// Acepta los nombres cortos de plantilla y los de JSON schema.
  fn parse(token: &str) -> Result<Self, DomainError> {
    match token.trim().to_lowercase().as_str() {
      "str" | "string" | "multiline" | "text" => Ok(FieldType::String),
      "int" | "integer" => Ok(FieldType::Integer),
      "float" | "number" => Ok(FieldType::Float),
      "bool" | "boolean" => Ok(FieldType::Boolean),
      "list" | "array" => Ok(FieldType::List),
      "dict" | "object" => Ok(FieldType::Object),
      other => Err(DomainError::ValidationError(format!("Tipo de campo desconocido: '{}'", other))),
    }
  }

  fn infer(value: &JsonValue) -> Self {
    match value {
      JsonValue::Bool(_) => FieldType::Boolean,
      JsonValue::Number(n) if n.is_i64() || n.is_u64() => FieldType::Integer,
      JsonValue::Number(_) => FieldType::Float,
      JsonValue::Array(_) => FieldType::List,
      JsonValue::Object(_) => FieldType::Object,
      JsonValue::String(_) | JsonValue::Null => FieldType::String,
    }
  }
}

/// Un campo del esquema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldSpec {
  pub name: String,
  pub field_type: FieldType,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<Vec<String>>,
}

impl FieldSpec {
  pub fn new(name: &str, field_type: FieldType) -> Self {
    Self { name: normalize_key(name),
           field_type,
           description: None,
           options: None }
  }

  pub fn with_options(mut self, options: &[&str]) -> Self {
    self.options = Some(options.iter().map(|o| o.to_string()).collect());
    self
  }
}

/// Esquema ordenado de campos (entrada o salida de un job).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct IoModel {
  pub fields: Vec<FieldSpec>,
}

impl IoModel {
  pub fn new(fields: Vec<FieldSpec>) -> Result<Self, DomainError> {
    if fields.is_empty() {
      return Err(DomainError::ValidationError("El esquema debe tener al menos un campo".to_string()));
    }
    let mut seen = std::collections::HashSet::new();
    for f in &fields {
      if f.name.is_empty() {
        return Err(DomainError::ValidationError("Nombre de campo vacío".to_string()));
      }
      if !seen.insert(f.name.clone()) {
        return Err(DomainError::ValidationError(format!("Campo duplicado: '{}'", f.name)));
      }
    }
    Ok(Self { fields })
  }

  pub fn keys(&self) -> Vec<String> {
    self.fields.iter().map(|f| f.name.clone()).collect()
  }

  /// Claves del esquema ausentes en `obj`.
  pub fn missing_keys(&self, obj: &JsonObject) -> Vec<String> {
    self.fields.iter().filter(|f| !obj.contains_key(&f.name)).map(|f| f.name.clone()).collect()
  }

  /// Representación textual estable, usada en prompts y en `io_hash`.
  pub fn template_schema(&self) -> String {
    self.fields
        .iter()
        .map(|f| {
          let mut line = format!("{}: <{}", f.name, f.field_type.as_str());
          if let Some(opts) = &f.options {
            line.push_str(&format!(", options=[{}]", opts.join(", ")));
          }
          line.push('>');
          if let Some(d) = &f.description {
            line.push_str(&format!(" # {}", d));
          }
          line
        })
        .collect::<Vec<_>>()
        .join("\n")
  }

  /// Infere el esquema a partir de objetos de ejemplo. Las claves se toman
  /// en orden de aparición y el tipo del primer valor no nulo.
  pub fn from_examples(objects: &[JsonObject]) -> Result<Self, DomainError> {
    let mut order: Vec<String> = Vec::new();
    let mut types: HashMap<String, Option<FieldType>> = HashMap::new();
    for obj in objects {
      for (key, value) in obj {
        let name = normalize_key(key);
        let slot = types.entry(name.clone()).or_insert_with(|| {
                                              order.push(name.clone());
                                              None
                                            });
        if slot.is_none() && !value.is_null() {
          *slot = Some(FieldType::infer(value));
        }
      }
    }
    if order.is_empty() {
      return Err(DomainError::ValidationError("No se puede inferir un esquema sin ejemplos".to_string()));
    }
    let fields = order.iter()
                      .map(|name| FieldSpec::new(name, types.get(name).copied().flatten().unwrap_or(FieldType::String)))
                      .collect();
    Self::new(fields)
  }

  /// Esquema de entrada desde líneas `Clave: {clave}`.
  pub fn from_input_template(text: &str) -> Result<Self, DomainError> {
    let mut fields = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
      let (label, rest) = split_line(line)?;
      let rest = rest.trim();
      let name = if rest.starts_with('{') && rest.ends_with('}') {
        &rest[1..rest.len() - 1]
      } else {
        label
      };
      fields.push(FieldSpec::new(name, FieldType::String));
    }
    Self::new(fields)
  }

  /// Esquema de salida desde líneas `Clave: <tipo, options=[A, B]>`.
  pub fn from_output_template(text: &str) -> Result<Self, DomainError> {
    let mut fields = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
      let (label, rest) = split_line(line)?;
      let rest = rest.trim();
      if !(rest.starts_with('<') && rest.ends_with('>')) {
        return Err(DomainError::ValidationError(format!("Se esperaba '<tipo>' en la línea '{}'", line)));
      }
      let inner = &rest[1..rest.len() - 1];
      let (type_token, tail) = match inner.split_once(',') {
        Some((t, tail)) => (t, tail),
        None => (inner, ""),
      };
      let mut field = FieldSpec::new(label, FieldType::parse(type_token)?);
      if let Some(start) = tail.find("options=[") {
        let opts = &tail[start + "options=[".len()..];
        let end = opts.find(']').ok_or_else(|| DomainError::ValidationError(format!("options sin cerrar en '{}'", line)))?;
        field.options = Some(opts[..end].split(',').map(|o| o.trim().to_string()).filter(|o| !o.is_empty()).collect());
      }
      fields.push(field);
    }
    Self::new(fields)
  }

  /// Esquema desde un objeto JSON schema (`properties`, `enum`, `description`).
  pub fn from_json_schema(schema: &JsonValue) -> Result<Self, DomainError> {
    let props = schema.get("properties")
                      .and_then(JsonValue::as_object)
                      .ok_or_else(|| DomainError::ValidationError("JSON schema sin 'properties'".to_string()))?;
    let mut fields = Vec::new();
    for (name, prop) in props {
      let type_token = prop.get("type").and_then(JsonValue::as_str).unwrap_or("string");
      let mut field = FieldSpec::new(name, FieldType::parse(type_token)?);
      field.description = prop.get("description").and_then(JsonValue::as_str).map(str::to_string);
      field.options = prop.get("enum").and_then(JsonValue::as_array).map(|vals| {
                                                                          vals.iter()
                                                                              .map(|v| match v {
                                                                                JsonValue::String(s) => s.clone(),
                                                                                other => other.to_string(),
                                                                              })
                                                                              .collect()
                                                                        });
      fields.push(field);
    }
    Self::new(fields)
  }
}

impl fmt::Display for IoModel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.template_schema())
  }
}

fn split_line(line: &str) -> Result<(&str, &str), DomainError> {
  line.split_once(':')
      .map(|(l, r)| (l.trim(), r))
      .ok_or_else(|| DomainError::ValidationError(format!("Línea de plantilla sin ':' -> '{}'", line)))
}

/// `Task Input` -> `task_input`.
fn normalize_key(raw: &str) -> String {
  raw.trim()
     .chars()
     .map(|c| if c.is_whitespace() || c == '-' { '_' } else { c.to_ascii_lowercase() })
     .collect()
}

/// Hash sha256 (hex) de esquema de entrada + esquema de salida + instrucción.
pub fn io_hash(input_model: &IoModel, output_model: &IoModel, instruction: Option<&str>) -> String {
  let mut hasher = Sha256::new();
  hasher.update(input_model.template_schema().as_bytes());
  hasher.update(b"\n--\n");
  hasher.update(output_model.template_schema().as_bytes());
  if let Some(instr) = instruction {
    hasher.update(b"\n--\n");
    hasher.update(instr.as_bytes());
  }
  format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn output_template_parses_types_and_options() {
    let model = IoModel::from_output_template("Sentiment Label: <str, options=[positive, negative]>\nScore: <float>")
      .expect("template válido");
    assert_eq!(model.keys(), vec!["sentiment_label", "score"]);
    assert_eq!(model.fields[0].options.as_deref(), Some(&["positive".to_string(), "negative".to_string()][..]));
    assert_eq!(model.fields[1].field_type, FieldType::Float);
  }

  #[test]
  fn input_template_uses_placeholder_names() {
    let model = IoModel::from_input_template("Review Text: {text}\nLanguage: {lang}").expect("template válido");
    assert_eq!(model.keys(), vec!["text", "lang"]);
  }

  #[test]
  fn examples_infer_field_types() {
    let a = json!({"text": "hola", "stars": 4, "tags": ["x"]}).as_object().cloned().unwrap_or_default();
    let model = IoModel::from_examples(&[a]).expect("inferencia");
    // las claves de un objeto JSON se recorren ordenadas
    assert_eq!(model.keys(), vec!["stars", "tags", "text"]);
    assert_eq!(model.fields[0].field_type, FieldType::Integer);
    assert_eq!(model.fields[1].field_type, FieldType::List);
    assert_eq!(model.fields[2].field_type, FieldType::String);
  }

  #[test]
  fn json_schema_maps_types_enums_and_descriptions() {
    let schema = json!({
      "type": "object",
      "properties": {
        "label": {"type": "string", "enum": ["positive", "negative"], "description": "Sentimiento"},
        "score": {"type": "number"},
        "tags": {"type": "array"},
        "notes": {}
      }
    });
    let model = IoModel::from_json_schema(&schema).expect("schema");
    assert_eq!(model.keys(), vec!["label", "notes", "score", "tags"]);
    assert_eq!(model.fields[0].options.as_deref(), Some(&["positive".to_string(), "negative".to_string()][..]));
    assert_eq!(model.fields[0].description.as_deref(), Some("Sentimiento"));
    assert_eq!(model.fields[1].field_type, FieldType::String);
    assert_eq!(model.fields[2].field_type, FieldType::Float);
    assert_eq!(model.fields[3].field_type, FieldType::List);

    assert!(IoModel::from_json_schema(&json!({"type": "object"})).is_err());
    assert!(IoModel::from_json_schema(&json!({"properties": {"x": {"type": "uuid"}}})).is_err());
  }

  #[test]
  fn io_hash_changes_with_instruction() {
    let i = IoModel::new(vec![FieldSpec::new("text", FieldType::String)]).expect("modelo");
    let o = IoModel::new(vec![FieldSpec::new("label", FieldType::String)]).expect("modelo");
    let h1 = io_hash(&i, &o, None);
    assert_eq!(h1, io_hash(&i, &o, None));
    assert_ne!(h1, io_hash(&i, &o, Some("classify sentiment")));
    assert_eq!(h1.len(), 64);
  }

  #[test]
  fn duplicate_fields_are_rejected() {
    let err = IoModel::new(vec![FieldSpec::new("a", FieldType::String), FieldSpec::new("A", FieldType::Integer)]);
    assert!(matches!(err, Err(DomainError::ValidationError(_))));
  }
}
