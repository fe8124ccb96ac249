// Fan-out concurrente sobre el motor. Un único primitivo: tareas tokio en un
// `JoinSet` limitadas por un `Semaphore`. Las tareas sólo reciben copias
// propias (plantilla y entradas); el job nunca cruza la frontera.
use crate::errors::{Result, WorkflowError};
use job_domain::{JobRecord, JobSetting, JsonObject};
use llm_providers::{EngineFactory, EngineOutput, PromptTemplate};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Orden de los resultados devueltos por un fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultOrder {
    /// Orden de finalización (el más rápido primero).
    #[default]
    Completion,
    /// Mismo orden que las entradas.
    Input,
}

/// Ejecuta la plantilla sobre cada entrada con como mucho `max_workers`
/// llamadas en vuelo. Los `None` del motor se descartan sin reintentar, así
/// que pueden volver menos resultados que entradas. El primer error aborta
/// las tareas restantes.
pub async fn fan_out(factory: Arc<dyn EngineFactory>,
                     template: PromptTemplate,
                     inputs: Vec<JsonObject>,
                     max_workers: usize,
                     order: ResultOrder)
                     -> Result<Vec<EngineOutput>> {
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut set = JoinSet::new();
    for (i, input) in inputs.into_iter().enumerate() {
        let engine = factory.from_template(&template)?;
        let semaphore = semaphore.clone();
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.map_err(|e| WorkflowError::Join(e.to_string()))?;
            let out = engine.run(&input).await?;
            Ok::<_, WorkflowError>((i, out))
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = set.join_next().await {
        let (i, out) = joined.map_err(|e| WorkflowError::Join(e.to_string()))??;
        if let Some(out) = out {
            results.push((i, out));
        }
    }
    if order == ResultOrder::Input {
        results.sort_by_key(|(i, _)| *i);
    }
    Ok(results.into_iter().map(|(_, out)| out).collect())
}

/// Entradas de un fan-out: la misma entrada N veces o N entradas distintas.
#[derive(Debug, Clone)]
pub enum FanOutInput {
    Replicate(JsonObject, usize),
    Distinct(Vec<JsonObject>),
}

/// Fan-out de un job con una variante dada.
pub struct AsyncGenerator {
    factory: Arc<dyn EngineFactory>,
    max_workers: usize,
    order: ResultOrder,
}

impl AsyncGenerator {
    pub fn new(factory: Arc<dyn EngineFactory>, max_workers: usize) -> Self {
        Self { factory,
               max_workers,
               order: ResultOrder::Completion }
    }

    pub fn with_order(mut self, order: ResultOrder) -> Self {
        self.order = order;
        self
    }

    pub async fn run(&self, job: &JobRecord, setting: &JobSetting, input: FanOutInput) -> Result<Vec<EngineOutput>> {
        let inputs = match input {
            FanOutInput::Replicate(input, n) => vec![input; n],
            FanOutInput::Distinct(inputs) => inputs,
        };
        let template = PromptTemplate::Job(job.prompt_for(setting));
        fan_out(self.factory.clone(), template, inputs, self.max_workers, self.order).await
    }
}

/// `AsyncGenerator` por cada entrada, secuencialmente entre entradas: como
/// mucho `runs_per_input` llamadas en vuelo a la vez, nunca
/// `runs_per_input * entradas`.
#[derive(Clone)]
pub struct SequentialAsyncGenerator {
    factory: Arc<dyn EngineFactory>,
    runs_per_input: usize,
    max_workers: usize,
}

impl SequentialAsyncGenerator {
    pub fn new(factory: Arc<dyn EngineFactory>, runs_per_input: usize, max_workers: usize) -> Self {
        Self { factory,
               runs_per_input,
               max_workers }
    }

    /// La posición `i` del resultado corresponde a `inputs[i]`.
    pub async fn run(&self, job: &JobRecord, setting: &JobSetting, inputs: &[JsonObject]) -> Result<Vec<Vec<EngineOutput>>> {
        self.run_template(PromptTemplate::Job(job.prompt_for(setting)), inputs.to_vec()).await
    }

    /// Igual que `run` sobre una plantilla ya construida; no necesita el job,
    /// de modo que puede ejecutarse dentro de una tarea.
    pub async fn run_template(&self, template: PromptTemplate, inputs: Vec<JsonObject>) -> Result<Vec<Vec<EngineOutput>>> {
        let mut out = Vec::with_capacity(inputs.len());
        for input in inputs {
            let replicas = vec![input; self.runs_per_input];
            out.push(fan_out(self.factory.clone(), template.clone(), replicas, self.max_workers, ResultOrder::Completion).await?);
        }
        Ok(out)
    }
}

/// Un `SequentialAsyncGenerator` completo por variante, con las variantes en
/// paralelo. El resultado `i` corresponde siempre a `settings[i]`.
pub struct MultiVariantGenerator {
    sequential: SequentialAsyncGenerator,
    max_workers: usize,
}

impl MultiVariantGenerator {
    pub fn new(factory: Arc<dyn EngineFactory>, runs_per_input: usize, max_workers: usize) -> Self {
        Self { sequential: SequentialAsyncGenerator::new(factory, runs_per_input, max_workers),
               max_workers }
    }

    pub async fn run(&self,
                     job: &JobRecord,
                     settings: &[JobSetting],
                     inputs: &[JsonObject])
                     -> Result<Vec<Vec<Vec<EngineOutput>>>> {
        let variants = Arc::new(Semaphore::new(self.max_workers.max(1)));
        let mut set = JoinSet::new();
        for (i, setting) in settings.iter().enumerate() {
            let template = PromptTemplate::Job(job.prompt_for(setting));
            let sequential = self.sequential.clone();
            let inputs = inputs.to_vec();
            let variants = variants.clone();
            set.spawn(async move {
                let _permit = variants.acquire_owned().await.map_err(|e| WorkflowError::Join(e.to_string()))?;
                let out = sequential.run_template(template, inputs).await?;
                Ok::<_, WorkflowError>((i, out))
            });
        }

        let mut results = Vec::with_capacity(settings.len());
        while let Some(joined) = set.join_next().await {
            results.push(joined.map_err(|e| WorkflowError::Join(e.to_string()))??);
        }
        results.sort_by_key(|(i, _)| *i);
        Ok(results.into_iter().map(|(_, out)| out).collect())
    }
}
