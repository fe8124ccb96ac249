//! llm-providers: frontera con el motor de completado
//!
//! El núcleo nunca construye prompts ni parsea completions: sólo consume el
//! contrato `Engine::run(input) -> (output, metrics)`. Este crate define ese
//! contrato, las plantillas que se le entregan al motor y los ajustes de
//! modelo.
mod engine;
mod errors;
mod options;
pub mod stubs;
mod template;

pub use engine::{Engine, EngineFactory, EngineOutput, JsonObject, RunMetrics};
pub use errors::EngineError;
pub use options::{context_size, EngineOptions};
pub use template::{render, BuiltinTemplate, JobPrompt, PromptExample, PromptTemplate};
