// Archivo: stubs.rs
// Propósito: motor en memoria respaldado por un closure, para pruebas y
// demos. Cada llamada recibe su índice global, la plantilla y la entrada.
use crate::engine::{Engine, EngineFactory, EngineOutput, JsonObject, RunMetrics};
use crate::template::PromptTemplate;
use crate::EngineError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Responder = dyn Fn(usize, &PromptTemplate, &JsonObject) -> Result<Option<JsonObject>, EngineError> + Send + Sync;

/// Fábrica de motores cuyo comportamiento define un closure.
#[derive(Clone)]
pub struct FnEngineFactory {
    responder: Arc<Responder>,
    calls: Arc<AtomicUsize>,
    metrics: RunMetrics,
}

impl FnEngineFactory {
    pub fn new<F>(responder: F) -> Self
        where F: Fn(usize, &PromptTemplate, &JsonObject) -> Result<Option<JsonObject>, EngineError> + Send + Sync + 'static
    {
        Self { responder: Arc::new(responder),
               calls: Arc::new(AtomicUsize::new(0)),
               metrics: RunMetrics { model_name: Some("stub".to_string()),
                                     ..RunMetrics::default() } }
    }

    /// Métricas que reportará cada llamada.
    pub fn with_metrics(mut self, metrics: RunMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Número total de llamadas `run` realizadas por los motores creados.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EngineFactory for FnEngineFactory {
    fn from_template(&self, template: &PromptTemplate) -> Result<Arc<dyn Engine>, EngineError> {
        Ok(Arc::new(FnEngine { template: template.clone(),
                               responder: self.responder.clone(),
                               calls: self.calls.clone(),
                               metrics: self.metrics.clone() }))
    }
}

struct FnEngine {
    template: PromptTemplate,
    responder: Arc<Responder>,
    calls: Arc<AtomicUsize>,
    metrics: RunMetrics,
}

#[async_trait]
impl Engine for FnEngine {
    async fn run(&self, input: &JsonObject) -> Result<Option<EngineOutput>, EngineError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let output = (self.responder)(n, &self.template, input)?;
        Ok(output.map(|output| EngineOutput { output,
                                              metrics: self.metrics.clone() }))
    }
}
