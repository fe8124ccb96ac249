use crate::job_record::JobRecord;
use crate::DomainError;
use dashmap::DashMap;
use job_log::{Event, GenerationEntry, InMemoryLogRepository, LogRepository};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// Forma de localizar un job. Exactamente una clave por búsqueda.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobLookup {
    Idx(String),
    Name(String),
    IoHash(String),
}

impl JobLookup {
    /// Construye la búsqueda desde argumentos opcionales; falla si no se da
    /// exactamente uno.
    pub fn from_parts(idx: Option<&str>, name: Option<&str>, io_hash: Option<&str>) -> Result<Self, DomainError> {
        match (idx, name, io_hash) {
            (Some(i), None, None) => Ok(JobLookup::Idx(i.to_string())),
            (None, Some(n), None) => Ok(JobLookup::Name(n.to_string())),
            (None, None, Some(h)) => Ok(JobLookup::IoHash(h.to_string())),
            _ => Err(DomainError::NotFound("Se requiere exactamente uno de idx, name o io_hash".to_string())),
        }
    }
}

/// Nombre libre en el registro: el original si no está usado; si no,
/// `{name}_v{N}` con N = número de claves que empiezan por `name`
/// (incrementado hasta encontrar uno libre).
pub fn safe_job_name(name: &str, registry_keys: &[String]) -> String {
    if !registry_keys.iter().any(|k| k == name) {
        return name.to_string();
    }
    let mut n = registry_keys.iter().filter(|k| k.starts_with(name)).count();
    loop {
        let candidate = format!("{}_v{}", name, n);
        if !registry_keys.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Contrato de almacenamiento de jobs y de su registro nombre/hash -> idx.
///
/// Las implementaciones sólo proveen las primitivas; la disciplina de
/// registro y vaciado de bitácoras vive en los métodos por defecto.
pub trait JobRepository: Send + Sync {
    /// Almacén de bitácoras asociado.
    fn log_store(&self) -> &dyn LogRepository;

    /// Registro completo clave -> idx.
    fn registry(&self) -> Result<BTreeMap<String, String>, DomainError>;

    /// Registra claves para `idx`. Falla si alguna ya apunta a otro job.
    fn register_keys(&self, idx: &str, keys: &[String]) -> Result<(), DomainError>;

    /// Elimina todas las claves que apuntan a `idx`.
    fn unregister_job(&self, idx: &str) -> Result<(), DomainError>;

    /// Persiste metadata, ejemplos e historial de versiones (no bitácoras).
    fn write_job(&self, job: &JobRecord) -> Result<(), DomainError>;

    /// Carga un job por id con bitácoras vacías.
    fn load_job(&self, idx: &str) -> Result<JobRecord, DomainError>;

    /// Borra los datos del job (no el registro ni las bitácoras).
    fn remove_job_data(&self, idx: &str) -> Result<(), DomainError>;

    fn registry_keys(&self) -> Result<Vec<String>, DomainError> {
        Ok(self.registry()?.into_keys().collect())
    }

    fn key_in_registry(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.registry()?.contains_key(key))
    }

    /// Resuelve una búsqueda al `idx` del job.
    fn resolve(&self, lookup: &JobLookup) -> Result<String, DomainError> {
        match lookup {
            JobLookup::Idx(idx) => {
                self.load_job(idx)?;
                Ok(idx.clone())
            }
            JobLookup::Name(key) | JobLookup::IoHash(key) => {
                self.registry()?.remove(key).ok_or_else(|| DomainError::NotFound(format!("job '{}'", key)))
            }
        }
    }

    fn get_job(&self, lookup: &JobLookup) -> Result<JobRecord, DomainError> {
        let idx = self.resolve(lookup)?;
        self.load_job(&idx)
    }

    /// Vacía las bitácoras en memoria hacia el almacén append-only. Eventos y
    /// generaciones se escriben por separado; no es atómico entre ambos.
    fn store_logs(&self, job: &mut JobRecord) -> Result<(), DomainError> {
        let n_events = self.log_store().append_events(&job.idx, &job.event_log)?;
        job.event_log.clear();
        let n_gens = self.log_store().append_generations(&job.idx, &job.generation_log)?;
        job.generation_log.clear();
        log::debug!("job {}: {} eventos y {} generaciones persistidos", job.idx, n_events, n_gens);
        Ok(())
    }

    fn store_job(&self, job: &mut JobRecord) -> Result<(), DomainError> {
        self.write_job(job)?;
        self.store_logs(job)
    }

    /// Persiste el job y mantiene el registro al día con su nombre y su
    /// io_hash actual (la instrucción puede haber cambiado). Las claves que
    /// ya pertenecen a otro job se omiten.
    fn update_job(&self, job: &mut JobRecord) -> Result<(), DomainError> {
        let registry = self.registry()?;
        let mut keys = vec![job.io_hash()];
        if let Some(name) = &job.job_name {
            keys.push(name.clone());
        }
        let fresh: Vec<String> = keys.into_iter()
                                     .filter(|k| match registry.get(k) {
                                         None => true,
                                         Some(owner) if owner == &job.idx => false,
                                         Some(owner) => {
                                             log::warn!("Clave '{}' ya registrada para el job {}; se omite", k, owner);
                                             false
                                         }
                                     })
                                     .collect();
        if !fresh.is_empty() {
            self.register_keys(&job.idx, &fresh)?;
        }
        self.store_job(job)
    }

    /// Elimina datos, claves de registro y bitácoras del job.
    fn delete_job(&self, idx: &str) -> Result<(), DomainError> {
        self.load_job(idx)?;
        self.remove_job_data(idx)?;
        self.unregister_job(idx)?;
        self.log_store().delete_logs(idx)?;
        Ok(())
    }

    fn load_event_log(&self, idx: &str) -> Result<Vec<Event>, DomainError> {
        Ok(self.log_store().read_events(idx)?)
    }

    fn load_generation_log(&self, idx: &str) -> Result<Vec<GenerationEntry>, DomainError> {
        Ok(self.log_store().read_generations(idx)?)
    }
}

/// Implementación en memoria para tests y desarrollo.
pub struct InMemoryJobRepository {
    registry: DashMap<String, String>,
    jobs: Arc<Mutex<HashMap<String, JobRecord>>>,
    logs: InMemoryLogRepository,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self { registry: DashMap::new(),
               jobs: Arc::new(Mutex::new(HashMap::new())),
               logs: InMemoryLogRepository::new() }
    }

    fn jobs(&self) -> Result<MutexGuard<'_, HashMap<String, JobRecord>>, DomainError> {
        self.jobs.lock().map_err(|e| DomainError::StorageError(format!("mutex poisoned: {:?}", e)))
    }
}

impl Default for InMemoryJobRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRepository for InMemoryJobRepository {
    fn log_store(&self) -> &dyn LogRepository {
        &self.logs
    }

    fn registry(&self) -> Result<BTreeMap<String, String>, DomainError> {
        Ok(self.registry.iter().map(|e| (e.key().clone(), e.value().clone())).collect())
    }

    fn register_keys(&self, idx: &str, keys: &[String]) -> Result<(), DomainError> {
        if let Some(taken) = keys.iter().find(|k| self.registry.get(*k).is_some_and(|owner| owner.value() != idx)) {
            return Err(DomainError::ValidationError(format!("Clave '{}' ya registrada para otro job", taken)));
        }
        for k in keys {
            self.registry.insert(k.clone(), idx.to_string());
        }
        Ok(())
    }

    fn unregister_job(&self, idx: &str) -> Result<(), DomainError> {
        self.registry.retain(|_, owner| owner.as_str() != idx);
        Ok(())
    }

    fn write_job(&self, job: &JobRecord) -> Result<(), DomainError> {
        let mut stored = job.clone();
        stored.event_log.clear();
        stored.generation_log.clear();
        self.jobs()?.insert(job.idx.clone(), stored);
        Ok(())
    }

    fn load_job(&self, idx: &str) -> Result<JobRecord, DomainError> {
        self.jobs()?.get(idx).cloned().ok_or_else(|| DomainError::NotFound(format!("job {}", idx)))
    }

    fn remove_job_data(&self, idx: &str) -> Result<(), DomainError> {
        self.jobs()?.remove(idx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_job_name_suffixes_by_prefix_count() {
        let keys = vec!["sentiment".to_string(), "abc123".to_string()];
        assert_eq!(safe_job_name("new_job", &keys), "new_job");
        assert_eq!(safe_job_name("sentiment", &keys), "sentiment_v1");
        let keys = vec!["sentiment".to_string(), "sentiment_v1".to_string()];
        assert_eq!(safe_job_name("sentiment", &keys), "sentiment_v2");
    }

    #[test]
    fn lookup_requires_exactly_one_key() {
        assert!(JobLookup::from_parts(None, None, None).is_err());
        assert!(JobLookup::from_parts(Some("a"), Some("b"), None).is_err());
        assert_eq!(JobLookup::from_parts(None, Some("b"), None).expect("ok"), JobLookup::Name("b".into()));
    }
}
