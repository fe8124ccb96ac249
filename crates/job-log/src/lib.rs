//! Crate `job-log`: eventos y bitácoras append-only de los jobs
//!
//! Este crate define los tipos de registro (`Event`, `GenerationEntry`), el
//! contrato de persistencia `LogRepository` y una implementación en memoria
//! útil para pruebas (`InMemoryLogRepository`).
//!
//! Diseño resumido:
//! - Append-only: un evento no se modifica una vez creado.
//! - Idempotencia: se usa `event_id` para evitar duplicados al volver a
//!   persistir una bitácora ya escrita.
//! - Las bitácoras se indexan por el `idx` del job dueño.
//!
//! Ejemplo rápido:
//! ```rust
//! use job_log::{Event, EventType, InMemoryLogRepository, LogRepository};
//! let repo = InMemoryLogRepository::new();
//! let ev = Event::new(EventType::JobCreation);
//! assert_eq!(repo.append_events("job-1", &[ev.clone(), ev]).unwrap(), 1);
//! ```
pub mod domain;
pub mod errors;
pub mod repository;
pub mod stubs;

pub use domain::*;
pub use errors::*;
pub use repository::*;
pub use stubs::*;
