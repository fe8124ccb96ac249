// Archivo: repository.rs
// Propósito: definir el trait `LogRepository`, el contrato que deben
// implementar las persistencias de bitácoras (archivos, memoria, etc.).
use crate::domain::{Event, GenerationEntry, Keyed};
use crate::errors::Result;
use std::collections::HashSet;

/// Contrato de las bitácoras append-only de un job.
///
/// Todas las operaciones de escritura son idempotentes por `event_id`:
/// volver a anexar un registro ya persistido no lo duplica.
pub trait LogRepository: Send + Sync {
    /// Anexa eventos a la bitácora del job. Devuelve cuántos eran nuevos.
    fn append_events(&self, job_idx: &str, events: &[Event]) -> Result<usize>;

    /// Anexa entradas de generación. Devuelve cuántas eran nuevas.
    fn append_generations(&self, job_idx: &str, entries: &[GenerationEntry]) -> Result<usize>;

    /// Lee la bitácora completa de eventos en orden de escritura.
    fn read_events(&self, job_idx: &str) -> Result<Vec<Event>>;

    /// Lee la bitácora completa de generaciones en orden de escritura.
    fn read_generations(&self, job_idx: &str) -> Result<Vec<GenerationEntry>>;

    /// Elimina ambas bitácoras del job (no falla si no existen).
    fn delete_logs(&self, job_idx: &str) -> Result<()>;
}

/// Filtra los registros cuyo `event_id` ya existe en `existing` o que se
/// repiten dentro del mismo lote. Conserva el orden de llegada.
pub fn filter_new<'a, T: Keyed + Clone>(existing: impl IntoIterator<Item = &'a str>, items: &[T]) -> Vec<T> {
    let mut seen: HashSet<String> = existing.into_iter().map(str::to_string).collect();
    items.iter()
         .filter(|item| seen.insert(item.key().to_string()))
         .cloned()
         .collect()
}
