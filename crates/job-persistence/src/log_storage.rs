use crate::jsonl::{append_jsonl, job_dir, read_jsonl};
use job_log::{filter_new, Event, GenerationEntry, Keyed, LogError, LogRepository, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const EVENT_LOG_FILE: &str = "event_log.jsonl";
pub const GENERATION_LOG_FILE: &str = "generation_log.jsonl";

/// Bitácoras append-only en `<base>/<job_idx>/*.jsonl`.
///
/// Antes de anexar se leen los `event_id` existentes, de modo que volver a
/// vaciar un lote ya persistido no duplica líneas.
pub struct FileLogStore {
  base_path: PathBuf,
  write_lock: Mutex<()>,
}

impl FileLogStore {
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self { base_path: base_path.into(),
           write_lock: Mutex::new(()) }
  }

  fn path(&self, job_idx: &str, file: &str) -> Result<PathBuf> {
    Ok(job_dir(&self.base_path, job_idx)?.join(file))
  }

  fn append<T>(&self, path: &Path, items: &[T]) -> Result<usize>
    where T: Keyed + Clone + serde::Serialize + serde::de::DeserializeOwned
  {
    let _guard = self.write_lock.lock().map_err(|e| LogError::Storage(format!("mutex poisoned: {:?}", e)))?;
    let existing: Vec<T> = read_jsonl(path)?;
    let fresh = filter_new(existing.iter().map(Keyed::key), items);
    append_jsonl(path, &fresh)?;
    Ok(fresh.len())
  }
}

impl LogRepository for FileLogStore {
  fn append_events(&self, job_idx: &str, events: &[Event]) -> Result<usize> {
    self.append(&self.path(job_idx, EVENT_LOG_FILE)?, events)
  }

  fn append_generations(&self, job_idx: &str, entries: &[GenerationEntry]) -> Result<usize> {
    self.append(&self.path(job_idx, GENERATION_LOG_FILE)?, entries)
  }

  fn read_events(&self, job_idx: &str) -> Result<Vec<Event>> {
    read_jsonl(&self.path(job_idx, EVENT_LOG_FILE)?)
  }

  fn read_generations(&self, job_idx: &str) -> Result<Vec<GenerationEntry>> {
    read_jsonl(&self.path(job_idx, GENERATION_LOG_FILE)?)
  }

  fn delete_logs(&self, job_idx: &str) -> Result<()> {
    for file in [EVENT_LOG_FILE, GENERATION_LOG_FILE] {
      let path = self.path(job_idx, file)?;
      if path.exists() {
        fs::remove_file(&path)?;
      }
    }
    Ok(())
  }
}
