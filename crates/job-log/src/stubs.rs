// Archivo: stubs.rs
// Propósito: implementación en memoria de `LogRepository` para pruebas y
// wiring rápido. No es durable.
use crate::domain::{Event, GenerationEntry, Keyed};
use crate::errors::{LogError, Result};
use crate::repository::{filter_new, LogRepository};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Bitácoras en memoria indexadas por `job_idx`.
pub struct InMemoryLogRepository {
    events: Mutex<HashMap<String, Vec<Event>>>,
    generations: Mutex<HashMap<String, Vec<GenerationEntry>>>,
}

impl InMemoryLogRepository {
    pub fn new() -> Self {
        Self { events: Mutex::new(HashMap::new()),
               generations: Mutex::new(HashMap::new()) }
    }

    /// Helper para mapear `Mutex::lock()` en un `Result` con
    /// `LogError::Storage`.
    fn lock<'a, T>(&'a self, m: &'a Mutex<T>) -> std::result::Result<MutexGuard<'a, T>, LogError> {
        m.lock().map_err(|e| LogError::Storage(format!("mutex poisoned: {:?}", e)))
    }
}

impl Default for InMemoryLogRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn append<T: Keyed + Clone>(log: &mut Vec<T>, items: &[T]) -> usize {
    let fresh = filter_new(log.iter().map(Keyed::key), items);
    let n = fresh.len();
    log.extend(fresh);
    n
}

impl LogRepository for InMemoryLogRepository {
    fn append_events(&self, job_idx: &str, events: &[Event]) -> Result<usize> {
        let mut map = self.lock(&self.events)?;
        Ok(append(map.entry(job_idx.to_string()).or_default(), events))
    }

    fn append_generations(&self, job_idx: &str, entries: &[GenerationEntry]) -> Result<usize> {
        let mut map = self.lock(&self.generations)?;
        Ok(append(map.entry(job_idx.to_string()).or_default(), entries))
    }

    fn read_events(&self, job_idx: &str) -> Result<Vec<Event>> {
        Ok(self.lock(&self.events)?.get(job_idx).cloned().unwrap_or_default())
    }

    fn read_generations(&self, job_idx: &str) -> Result<Vec<GenerationEntry>> {
        Ok(self.lock(&self.generations)?.get(job_idx).cloned().unwrap_or_default())
    }

    fn delete_logs(&self, job_idx: &str) -> Result<()> {
        self.lock(&self.events)?.remove(job_idx);
        self.lock(&self.generations)?.remove(job_idx);
        Ok(())
    }
}
