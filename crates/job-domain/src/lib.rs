mod domain_stubs;
mod errors;
mod example_record;
mod io_model;
mod job_record;
mod job_repository;

pub use domain_stubs::DomainStubs;
pub use errors::DomainError;
pub use example_record::{DataType, Example, ExampleRecord, VerificationType};
pub use io_model::{io_hash, FieldSpec, FieldType, IoModel};
pub use job_record::{JobMetadata, JobRecord, JobSetting};
pub use job_repository::{safe_job_name, InMemoryJobRepository, JobLookup, JobRepository};
// Re-export de los tipos de bitácora para que los crates superiores no
// dependan directamente de `job-log`.
pub use job_log::{Event, EventType, ExampleRef, GenerationEntry, LogRepository};
pub use llm_providers::JsonObject;
