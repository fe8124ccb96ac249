//! job-workflow: ciclo de vida de jobs sobre un motor de completado
//!
//! Crate que orquesta la ejecución de jobs (`job_domain::JobRecord`) contra
//! un `llm_providers::EngineFactory`: generadores simples, concurrentes y por
//! consenso, evaluación, gestión de ejemplos, optimizadores de instrucción y
//! de ejemplos, y el servicio `JobManager` con su fachada `Program`.

pub mod config;
mod engine_call;
pub mod errors;
pub mod evaluation;
pub mod example_manager;
pub mod factory;
pub mod generator;
pub mod instruction;
pub mod manager;
pub mod optimizer;
pub mod program;

pub use config::{GeneratorKind, OptimizerSettings, ProgramSettings, PromptType};
pub use errors::{Result, WorkflowError};
pub use evaluation::{EvalMetrics, EvaluationEngine, Metric};
pub use example_manager::{Combinations, ExampleManager, TestSetMode};
pub use factory::{CreateJobRequest, JobCreator};
pub use generator::{GenerationMetrics, OutputGenerator, ResultOrder, VoteMode};
pub use instruction::InstructionGenerator;
pub use manager::JobManager;
pub use optimizer::{ExampleOptimizer, ExampleSearch, InstructionOptimizer, InstructionSearch};
pub use program::Program;
