//! Evaluación de variantes de un job contra un conjunto de ejemplos.
mod engine;
mod metrics;

pub use engine::EvaluationEngine;
pub use metrics::{average, explicit_accuracy, implicit_accuracy, EvalMetrics, Metric};
