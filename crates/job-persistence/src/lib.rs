//! Persistencia en disco para jobs y bitácoras.
//! Este archivo expone el repositorio de archivos que implementa
//! `JobRepository` (jobs + registro) y `LogRepository` (bitácoras JSONL). La
//! implementación detallada está en `job_storage.rs` y `log_storage.rs`.

mod jsonl;
mod job_storage;
mod log_storage;

pub use job_storage::{new_from_env, FileJobStorage, DEFAULT_BASE_PATH};
pub use log_storage::FileLogStore;
