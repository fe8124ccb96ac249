//! Creación de jobs. Una petición elige exactamente una estrategia según
//! los argumentos presentes: esquemas explícitos, plantilla de texto o sólo
//! pares de ejemplo.
mod job_factory;

pub use job_factory::{extract_sections, job_factory, CreateJobRequest, ExampleJobCreator, JobCreator, ModelJobCreator,
                      PromptSections, TemplateJobCreator};
