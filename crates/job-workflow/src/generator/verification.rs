// Funciones puras (salvo el desempate) para reducir varias salidas de la
// misma entrada a una sola.
use super::GenerationMetrics;
use crate::engine_call::{object, run_builtin};
use crate::errors::{Result, WorkflowError};
use indexmap::IndexMap;
use job_domain::JsonObject;
use llm_providers::{BuiltinTemplate, EngineFactory, EngineOutput, RunMetrics};
use serde_json::{json, Value as JsonValue};

/// Claves que sólo contienen razonamiento y no cuentan para la igualdad.
pub const REASONING_KEYS: [&str; 3] = ["reason", "chain-of-thoughts", "reasoning"];

pub fn strip_reasoning(output: &JsonObject) -> JsonObject {
    output.iter()
          .filter(|(k, _)| !REASONING_KEYS.contains(&k.as_str()))
          .map(|(k, v)| (k.clone(), v.clone()))
          .collect()
}

/// Salida agrupada con el número de votos que recibió.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedOutput {
    /// Primera salida vista del grupo, con su razonamiento.
    pub output: JsonObject,
    pub count: usize,
}

/// Agrupa por igualdad tras quitar el razonamiento y ordena por votos
/// descendente. Los empates conservan el orden de primera aparición.
pub fn rank_outputs(outputs: &[JsonObject]) -> Vec<RankedOutput> {
    let mut groups: IndexMap<String, RankedOutput> = IndexMap::new();
    for output in outputs {
        let key = JsonValue::Object(strip_reasoning(output)).to_string();
        groups.entry(key)
              .or_insert_with(|| RankedOutput { output: output.clone(),
                                                count: 0 })
              .count += 1;
    }
    let mut ranked: Vec<RankedOutput> = groups.into_values().collect();
    // sort_by es estable
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

/// Salidas únicas (sin quitar razonamiento) en orden de primera aparición.
pub fn unique_outputs(outputs: &[JsonObject]) -> Vec<JsonObject> {
    let mut unique: Vec<JsonObject> = Vec::new();
    for output in outputs {
        if !unique.contains(output) {
            unique.push(output.clone());
        }
    }
    unique
}

/// Media elemento a elemento de las métricas de cada ejecución. Los errores
/// se concatenan; modelo y configuración se toman de la primera.
pub fn merge_metrics(runs: &[RunMetrics]) -> GenerationMetrics {
    let Some(first) = runs.first() else {
        return GenerationMetrics::default();
    };
    let n = runs.len() as f64;
    GenerationMetrics { execution_time: runs.iter().map(|m| m.execution_time).sum::<f64>() / n,
                        token_usage: runs.iter().map(|m| m.token_usage as f64).sum::<f64>() / n,
                        failure_rate: runs.iter().map(|m| m.failure_rate).sum::<f64>() / n,
                        num_runs: runs.len(),
                        model_name: first.model_name.clone(),
                        model_config: first.model_config.clone(),
                        errors: runs.iter().filter_map(|m| m.errors.clone()).flatten().collect(),
                        reliability: None,
                        verification_type: None }
}

/// Salida ganadora si el grupo más votado alcanza `min_votes`, con
/// `reliability = votos / total`.
pub fn majority_vote(outputs: &[JsonObject], min_votes: usize) -> Option<(JsonObject, f64)> {
    let ranked = rank_outputs(outputs);
    let top = ranked.first()?;
    if top.count >= min_votes {
        Some((top.output.clone(), top.count as f64 / outputs.len() as f64))
    } else {
        None
    }
}

/// Índice devuelto por el motor, validado contra `len`.
fn parse_index(value: Option<&JsonValue>, len: usize) -> Option<usize> {
    let idx = match value? {
        JsonValue::Number(n) => n.as_u64()? as usize,
        JsonValue::String(s) => s.trim().parse::<usize>().ok()?,
        _ => return None,
    };
    (idx < len).then_some(idx)
}

/// Pide al motor que elija la mejor entre `candidates` (una única llamada).
/// Un índice ausente, no numérico o fuera de rango cae en el primer
/// candidato.
pub async fn get_best_output(factory: &dyn EngineFactory,
                             instruction: Option<&str>,
                             input: &JsonObject,
                             candidates: &[JsonObject])
                             -> Result<JsonObject> {
    let first = candidates.first()
                          .ok_or_else(|| WorkflowError::NoVotes("no hay salidas entre las que elegir".to_string()))?;
    let request = object([("task_instruction", json!(instruction.unwrap_or_default())),
                          ("task_input", JsonValue::Object(input.clone())),
                          ("task_output", json!(candidates))]);
    let chosen = match run_builtin(factory, BuiltinTemplate::FindBest, request).await {
        Ok(EngineOutput { output, .. }) => parse_index(output.get("index"), candidates.len()),
        Err(WorkflowError::EngineOutput(msg)) => {
            log::warn!("Desempate sin salida del motor: {}", msg);
            None
        }
        Err(e) => return Err(e),
    };
    match chosen {
        Some(i) => Ok(candidates[i].clone()),
        None => {
            log::warn!("Índice de desempate inválido; se usa la primera salida");
            Ok(first.clone())
        }
    }
}
