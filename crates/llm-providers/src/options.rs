// options.rs
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;

/// Tamaño de contexto usado cuando el modelo no está en la tabla.
const DEFAULT_CONTEXT_SIZE: usize = 2049;

static MODEL_CONTEXT_SIZE: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
  HashMap::from([("gpt-4", 8192),
                 ("gpt-4-0314", 8192),
                 ("gpt-4-0613", 8192),
                 ("gpt-4-32k", 32768),
                 ("gpt-4-32k-0314", 32768),
                 ("gpt-4-32k-0613", 32768),
                 ("gpt-3.5-turbo", 4096),
                 ("gpt-3.5-turbo-0301", 4096),
                 ("gpt-3.5-turbo-0613", 4096),
                 ("gpt-3.5-turbo-16k", 16385),
                 ("gpt-3.5-turbo-16k-0613", 16385),
                 ("gpt-3.5-turbo-instruct", 4096),
                 ("text-davinci-003", 4097),
                 ("text-davinci-002", 4097),
                 ("code-davinci-002", 8001)])
});

/// Tamaño máximo de contexto conocido para un modelo.
pub fn context_size(model_name: &str) -> usize {
  MODEL_CONTEXT_SIZE.get(model_name).copied().unwrap_or(DEFAULT_CONTEXT_SIZE)
}

/// Ajustes del modelo que se pasan al motor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
  pub model_name: String,
  pub max_tokens: u32,
  pub temperature: f32,
  pub top_p: f32,
  pub frequency_penalty: f32,
  pub presence_penalty: f32,
  pub max_retry: u32,
}

impl Default for EngineOptions {
  fn default() -> Self {
    Self { model_name: "gpt-3.5-turbo".to_string(),
           max_tokens: 3000,
           temperature: 0.9,
           top_p: 1.0,
           frequency_penalty: 0.0,
           presence_penalty: 0.0,
           max_retry: 3 }
  }
}

impl EngineOptions {
  /// Lee `LLMP_MODEL_NAME`, `LLMP_TEMPERATURE` y `LLMP_MAX_TOKENS` (con
  /// soporte de `.env`). Los valores ausentes o inválidos conservan el
  /// default.
  pub fn from_env() -> Self {
    dotenvy::dotenv().ok();
    let mut opts = Self::default();
    if let Ok(name) = env::var("LLMP_MODEL_NAME") {
      if !name.trim().is_empty() {
        opts.model_name = name;
      }
    }
    if let Some(t) = env::var("LLMP_TEMPERATURE").ok().and_then(|v| v.parse().ok()) {
      opts.temperature = t;
    }
    if let Some(m) = env::var("LLMP_MAX_TOKENS").ok().and_then(|v| v.parse().ok()) {
      opts.max_tokens = m;
    }
    opts
  }

  /// Tokens disponibles para la respuesta, acotados por el contexto del modelo.
  pub fn completion_budget(&self) -> usize {
    (self.max_tokens as usize).min(context_size(&self.model_name))
  }
}
