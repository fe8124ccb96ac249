use crate::jsonl::{self, read_json, read_jsonl, write_json, write_jsonl};
use crate::log_storage::FileLogStore;
use job_domain::{DomainError, ExampleRecord, JobMetadata, JobRecord, JobRepository};
use job_log::LogRepository;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub const DEFAULT_BASE_PATH: &str = "./data/jobs";
const REGISTER_FILE: &str = "job_register.json";
const METADATA_FILE: &str = "metadata.json";
const EXAMPLES_FILE: &str = "examples.jsonl";
const VERSION_HISTORY_FILE: &str = "version_history.jsonl";

/// Repositorio de jobs en disco.
///
/// Estructura:
/// - `<base>/job_register.json`: clave (nombre o io_hash) -> idx.
/// - `<base>/<idx>/metadata.json`, `examples.jsonl`, `version_history.jsonl`.
/// - `<base>/<idx>/event_log.jsonl`, `generation_log.jsonl` (append-only).
pub struct FileJobStorage {
  base_path: PathBuf,
  logs: FileLogStore,
  registry_lock: Mutex<()>,
}

impl FileJobStorage {
  pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, DomainError> {
    let base_path = base_path.into();
    fs::create_dir_all(&base_path)?;
    Ok(Self { logs: FileLogStore::new(base_path.clone()),
              base_path,
              registry_lock: Mutex::new(()) })
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  fn job_dir(&self, idx: &str) -> Result<PathBuf, DomainError> {
    Ok(jsonl::job_dir(&self.base_path, idx)?)
  }

  fn register_path(&self) -> PathBuf {
    self.base_path.join(REGISTER_FILE)
  }

  fn lock(&self) -> Result<MutexGuard<'_, ()>, DomainError> {
    self.registry_lock.lock().map_err(|e| DomainError::StorageError(format!("mutex poisoned: {:?}", e)))
  }

  fn read_registry(&self) -> Result<BTreeMap<String, String>, DomainError> {
    Ok(read_json(&self.register_path())?.unwrap_or_default())
  }

  /// Ids de los jobs con directorio en disco.
  pub fn list_job_ids(&self) -> Result<Vec<String>, DomainError> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(&self.base_path)? {
      let entry = entry?;
      if entry.path().join(METADATA_FILE).exists() {
        ids.push(entry.file_name().to_string_lossy().to_string());
      }
    }
    ids.sort();
    Ok(ids)
  }
}

impl JobRepository for FileJobStorage {
  fn log_store(&self) -> &dyn LogRepository {
    &self.logs
  }

  fn registry(&self) -> Result<BTreeMap<String, String>, DomainError> {
    let _guard = self.lock()?;
    self.read_registry()
  }

  fn register_keys(&self, idx: &str, keys: &[String]) -> Result<(), DomainError> {
    let _guard = self.lock()?;
    let mut registry = self.read_registry()?;
    if let Some(taken) = keys.iter().find(|k| registry.get(*k).is_some_and(|owner| owner != idx)) {
      return Err(DomainError::ValidationError(format!("Clave '{}' ya registrada para otro job", taken)));
    }
    for k in keys {
      registry.insert(k.clone(), idx.to_string());
    }
    write_json(&self.register_path(), &registry)?;
    Ok(())
  }

  fn unregister_job(&self, idx: &str) -> Result<(), DomainError> {
    let _guard = self.lock()?;
    let mut registry = self.read_registry()?;
    registry.retain(|_, owner| owner.as_str() != idx);
    write_json(&self.register_path(), &registry)?;
    Ok(())
  }

  fn write_job(&self, job: &JobRecord) -> Result<(), DomainError> {
    let dir = self.job_dir(&job.idx)?;
    fs::create_dir_all(&dir)?;
    write_json(&dir.join(METADATA_FILE), &JobMetadata::from_job(job))?;
    write_jsonl(&dir.join(EXAMPLES_FILE), &job.example_records)?;
    write_jsonl(&dir.join(VERSION_HISTORY_FILE), &job.version_history)?;
    log::debug!("job {} guardado en {}", job.idx, dir.display());
    Ok(())
  }

  fn load_job(&self, idx: &str) -> Result<JobRecord, DomainError> {
    let dir = self.job_dir(idx)?;
    let metadata: JobMetadata =
      read_json(&dir.join(METADATA_FILE))?.ok_or_else(|| DomainError::NotFound(format!("job {}", idx)))?;
    let examples: Vec<ExampleRecord> = read_jsonl(&dir.join(EXAMPLES_FILE))?;
    let history: Vec<JsonValue> = read_jsonl(&dir.join(VERSION_HISTORY_FILE))?;
    Ok(metadata.into_job(examples, history))
  }

  fn remove_job_data(&self, idx: &str) -> Result<(), DomainError> {
    let dir = self.job_dir(idx)?;
    if dir.exists() {
      fs::remove_dir_all(&dir)?;
    }
    Ok(())
  }
}

/// Crea el repositorio en `LLMP_BASE_PATH` (o `./data/jobs`), leyendo `.env`
/// si existe.
pub fn new_from_env() -> Result<FileJobStorage, DomainError> {
  dotenvy::dotenv().ok();
  let base = env::var("LLMP_BASE_PATH").unwrap_or_else(|_| DEFAULT_BASE_PATH.to_string());
  log::info!("Usando almacenamiento de jobs en {}", base);
  FileJobStorage::new(base)
}
