// program.rs
// Fachada de uso: un programa envuelve un job persistido y se llama como
// una función sobre entradas JSON.
use crate::config::{GeneratorKind, PromptType};
use crate::errors::{Result, WorkflowError};
use crate::factory::CreateJobRequest;
use crate::generator::{GenerationMetrics, HumanVerifier, MajorityVoteGenerator, VoteMode};
use crate::manager::JobManager;
use job_domain::{DataType, DomainError, Event, ExampleRecord, GenerationEntry, JobLookup, JobRecord, JobRepository, JsonObject};
use std::sync::Arc;

pub struct Program<R: JobRepository> {
  manager: JobManager<R>,
  job: JobRecord,
  verifier: Option<Arc<dyn HumanVerifier>>,
}

/// Id de job: 32 dígitos hexadecimales.
fn looks_like_idx(signature: &str) -> bool {
  signature.len() == 32 && signature.chars().all(|c| c.is_ascii_hexdigit())
}

fn not_found_as_none(result: Result<JobRecord>) -> Result<Option<JobRecord>> {
  match result {
    Ok(job) => Ok(Some(job)),
    Err(WorkflowError::Domain(DomainError::NotFound(_))) => Ok(None),
    Err(e) => Err(e),
  }
}

impl<R: JobRepository> Program<R> {
  /// Abre el programa `signature` (id o nombre). Si `load_if_exist`, se
  /// busca primero por firma y después por esquemas; si no aparece se crea
  /// con `request`.
  pub async fn open(manager: JobManager<R>, signature: &str, mut request: CreateJobRequest, load_if_exist: bool) -> Result<Self> {
    if load_if_exist {
      if let Some(job) = Self::load_by_signature(&manager, signature)? {
        return Ok(Self::with_job(manager, job));
      }
      if let (Some(input), Some(output)) = (&request.input_model, &request.output_model) {
        let found = not_found_as_none(manager.get_job_by_models(input, output, request.instruction.as_deref()))?;
        if let Some(job) = found {
          return Ok(Self::with_job(manager, job));
        }
      }
    }
    request.job_name = Some(signature.to_string());
    if request.config.is_none() {
      request.config = Some(manager.settings().to_json());
    }
    let job = manager.create_job(request).await?;
    Ok(Self::with_job(manager, job))
  }

  /// Carga un programa existente; falla si no existe.
  pub fn load(manager: JobManager<R>, signature: &str) -> Result<Self> {
    match Self::load_by_signature(&manager, signature)? {
      Some(job) => Ok(Self::with_job(manager, job)),
      None => Err(DomainError::NotFound(format!("programa '{}'", signature)).into()),
    }
  }

  fn with_job(manager: JobManager<R>, job: JobRecord) -> Self {
    Self { manager,
           job,
           verifier: None }
  }

  /// Verificador de la primera ejecución cuando `fr_human_verification`
  /// está activo.
  pub fn with_verifier(mut self, verifier: Arc<dyn HumanVerifier>) -> Self {
    self.verifier = Some(verifier);
    self
  }

  fn load_by_signature(manager: &JobManager<R>, signature: &str) -> Result<Option<JobRecord>> {
    let lookup = if looks_like_idx(signature) {
      JobLookup::Idx(signature.to_string())
    } else {
      JobLookup::Name(signature.to_string())
    };
    not_found_as_none(manager.get_job(&lookup))
  }

  /// Genera la salida para `input`. En la primera ejecución de un programa
  /// que no es zero-shot se vota por consenso (o elige el verificador
  /// humano) y el par se guarda como ejemplo semisintético; con optimización
  /// de primera ejecución el pool se rellena después. Un relleno incompleto
  /// no invalida la salida ya generada.
  pub async fn call(&mut self, input: &JsonObject) -> Result<(JsonObject, GenerationMetrics)> {
    let settings = self.manager.settings().clone();
    let first_run = self.job.example_records.is_empty() && settings.program_type != PromptType::ZeroShot;

    let (output, metrics, event) = if first_run && settings.fr_human_verification {
      let voter = self.human_voter();
      self.manager.generate_logged_by(&mut self.job, input, &voter).await?
    } else {
      let kind = match (&settings.generator_type, first_run) {
        (GeneratorKind::Consensus { .. }, _) | (_, false) => settings.generator_type.clone(),
        (GeneratorKind::Simple, true) => GeneratorKind::consensus(),
      };
      self.manager.generate_logged(&mut self.job, input, &kind).await?
    };

    if first_run {
      let record = ExampleRecord::new(input.clone(), output.clone()).with_provenance(Some(event.event_id),
                                                                                      metrics.verification_type,
                                                                                      metrics.reliability,
                                                                                      DataType::SemiSynthetic);
      self.job.add_example(record);
      if settings.fr_optimization && settings.auto_optimize {
        log::info!("programa {}: primera ejecución, se rellena el pool hasta {}",
                   self.job.idx,
                   settings.total_sample_size);
        if let Err(e) = self.manager.fill_examples(&mut self.job, settings.total_sample_size).await {
          log::warn!("programa {}: el pool no se completó ({}); se conserva la salida", self.job.idx, e);
          self.manager.update_job(&mut self.job)?;
        }
      } else {
        self.manager.update_job(&mut self.job)?;
      }
    }
    Ok((output, metrics))
  }

  /// Votador de la primera ejecución con verificación humana. Sin
  /// verificador configurado la generación devuelve `Unsupported`.
  fn human_voter(&self) -> MajorityVoteGenerator {
    let voter = self.manager.voter().with_mode(VoteMode::HumanVerified);
    match &self.verifier {
      Some(verifier) => voter.with_verifier(verifier.clone()),
      None => voter,
    }
  }

  pub fn job(&self) -> &JobRecord {
    &self.job
  }

  pub fn manager(&self) -> &JobManager<R> {
    &self.manager
  }

  pub fn event_log(&self) -> Result<Vec<Event>> {
    self.manager.get_event_log(&self.job.idx)
  }

  pub fn generation_log(&self) -> Result<Vec<GenerationEntry>> {
    self.manager.get_generation_log(&self.job.idx)
  }
}
