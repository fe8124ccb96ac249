// manager.rs
// Servicio de jobs: creación con deduplicación, búsqueda, generación
// registrada, instrucciones, relleno de ejemplos y optimización. Las
// bitácoras se vacían al repositorio después de cada operación que las
// alimenta.
use crate::config::{GeneratorKind, ProgramSettings};
use crate::errors::{Result, WorkflowError};
use crate::evaluation::{EvalMetrics, EvaluationEngine};
use crate::example_manager::ExampleManager;
use crate::factory::{job_factory, CreateJobRequest};
use crate::generator::{ExampleGenerator, GenerationMetrics, MajorityVoteGenerator, OutputGenerator, VoteMode};
use crate::instruction::InstructionGenerator;
use crate::optimizer::{ExampleOptimizer, ExampleSearch, InstructionOptimizer, InstructionSearch};
use job_domain::{io_hash, safe_job_name, Event, EventType, ExampleRef, GenerationEntry, IoModel, JobLookup, JobRecord,
                 JobRepository, JobSetting, JsonObject};
use job_persistence::FileJobStorage;
use llm_providers::{EngineFactory, EngineOptions};
use std::sync::Arc;

pub struct JobManager<R: JobRepository> {
  repo: Arc<R>,
  factory: Arc<dyn EngineFactory>,
  settings: ProgramSettings,
}

impl<R: JobRepository> JobManager<R> {
  pub fn new(repo: Arc<R>, factory: Arc<dyn EngineFactory>, settings: ProgramSettings) -> Self {
    Self { repo,
           factory,
           settings }
  }

  pub fn repo(&self) -> &R {
    &self.repo
  }

  pub fn settings(&self) -> &ProgramSettings {
    &self.settings
  }

  /// Crea y persiste un job. Si ya existe uno con el mismo io_hash (tal como
  /// se pidió, antes de derivar instrucción) se devuelve ese sin registrar
  /// nada nuevo. Un nombre ya usado se renombra con sufijo `_v<N>`.
  pub async fn create_job(&self, mut request: CreateJobRequest) -> Result<JobRecord> {
    if request.config.is_none() {
      request.config = Some(self.settings.to_json());
    }
    let mut job = job_factory(request)?;

    let requested_hash = job.io_hash();
    let registry = self.repo.registry()?;
    if let Some(existing) = registry.get(&requested_hash) {
      log::info!("Job con io_hash {} ya existe ({}); no se crea otro", requested_hash, existing);
      return Ok(self.repo.load_job(existing)?);
    }

    let keys: Vec<String> = registry.into_keys().collect();
    if let Some(name) = job.job_name.clone() {
      let safe = safe_job_name(&name, &keys);
      if safe != name {
        log::info!("Nombre '{}' en uso; el job se registra como '{}'", name, safe);
        job.job_name = Some(safe);
      }
    }

    // los eventos example_add de las semillas van detrás de job_creation
    let seed_events = std::mem::take(&mut job.event_log);
    let seed_ids: Vec<String> = job.example_records.iter().map(|r| r.idx.clone()).collect();
    let mut creation = Event::new(EventType::JobCreation).with_version(job.version)
                                                         .with_example(ExampleRef::Many(seed_ids.clone()), None);
    creation.job_setting = Some(JobSetting::with_examples(job.instruction.clone(), seed_ids).to_json());
    job.log_event(creation);
    job.event_log.extend(seed_events);

    if job.instruction.is_none() {
      let derived = InstructionGenerator::new(self.factory.clone()).generate(&job).await?;
      log::info!("job {}: instrucción derivada: {}", job.idx, derived);
      job.log_event(Event::new(EventType::JobUpdate).with_version(job.version)
                                                    .with_extra(JobSetting::with_instruction(derived.clone()).to_json()));
      job.instruction = Some(derived);
    }

    let mut register = Vec::new();
    if let Some(name) = &job.job_name {
      register.push(name.clone());
    }
    register.push(requested_hash);
    let current_hash = job.io_hash();
    if !register.contains(&current_hash) {
      register.push(current_hash);
    }
    self.repo.register_keys(&job.idx, &register)?;
    if let Err(e) = self.repo.store_job(&mut job) {
      log::error!("job {}: no se pudo guardar, se retiran sus claves: {}", job.idx, e);
      self.repo.unregister_job(&job.idx)?;
      return Err(e.into());
    }
    log::info!("job {} creado ({:?})", job.idx, job.job_name);
    Ok(job)
  }

  pub fn get_job(&self, lookup: &JobLookup) -> Result<JobRecord> {
    Ok(self.repo.get_job(lookup)?)
  }

  /// Búsqueda con exactamente una de las tres claves.
  pub fn find_job(&self, idx: Option<&str>, job_name: Option<&str>, hash: Option<&str>) -> Result<JobRecord> {
    self.get_job(&JobLookup::from_parts(idx, job_name, hash)?)
  }

  pub fn get_job_by_models(&self, input_model: &IoModel, output_model: &IoModel, instruction: Option<&str>) -> Result<JobRecord> {
    self.get_job(&JobLookup::IoHash(io_hash(input_model, output_model, instruction)))
  }

  pub fn update_job(&self, job: &mut JobRecord) -> Result<()> {
    Ok(self.repo.update_job(job)?)
  }

  pub fn delete_job(&self, idx: &str) -> Result<()> {
    Ok(self.repo.delete_job(idx)?)
  }

  /// Genera con el generador configurado, registra un evento y lo persiste.
  pub async fn generate_output(&self, job: &mut JobRecord, input: &JsonObject) -> Result<(JsonObject, GenerationMetrics)> {
    let kind = self.settings.generator_type.clone();
    self.generate_output_with(job, input, &kind).await
  }

  pub async fn generate_output_with(&self,
                                    job: &mut JobRecord,
                                    input: &JsonObject,
                                    kind: &GeneratorKind)
                                    -> Result<(JsonObject, GenerationMetrics)> {
    let (output, metrics, _event) = self.generate_logged(job, input, kind).await?;
    Ok((output, metrics))
  }

  /// Como `generate_output_with`, devolviendo también el evento registrado.
  pub async fn generate_logged(&self,
                               job: &mut JobRecord,
                               input: &JsonObject,
                               kind: &GeneratorKind)
                               -> Result<(JsonObject, GenerationMetrics, Event)> {
    let generator: Box<dyn OutputGenerator> = kind.build(self.factory.clone(), self.settings.max_workers);
    self.generate_logged_by(job, input, generator.as_ref()).await
  }

  /// Genera con un generador ya construido y persiste las bitácoras.
  pub async fn generate_logged_by(&self,
                                  job: &mut JobRecord,
                                  input: &JsonObject,
                                  generator: &dyn OutputGenerator)
                                  -> Result<(JsonObject, GenerationMetrics, Event)> {
    let missing = job.input_model.missing_keys(input);
    if !missing.is_empty() {
      log::warn!("job {}: entrada sin las claves {:?}", job.idx, missing);
    }
    let generated = generator.generate_logged(job, input, &JobSetting::default()).await?;
    self.repo.store_logs(job)?;
    Ok(generated)
  }

  /// Deriva una instrucción para el job sin aplicarla.
  pub async fn generate_instruction(&self, job: &JobRecord) -> Result<String> {
    InstructionGenerator::new(self.factory.clone()).generate(job).await
  }

  pub fn get_event_log(&self, idx: &str) -> Result<Vec<Event>> {
    Ok(self.repo.load_event_log(idx)?)
  }

  pub fn get_generation_log(&self, idx: &str) -> Result<Vec<GenerationEntry>> {
    Ok(self.repo.load_generation_log(idx)?)
  }

  /// Rellena el pool hasta `total` y persiste lo conseguido aunque no se
  /// alcance el objetivo.
  pub async fn fill_examples(&self, job: &mut JobRecord, total: usize) -> Result<usize> {
    let filled = self.example_manager().fill_examples(job, total).await;
    self.repo.update_job(job)?;
    filled
  }

  pub async fn optimize_instruction(&self, job: &mut JobRecord, num_candidates: usize) -> Result<InstructionSearch> {
    let optimizer = InstructionOptimizer::new(self.example_manager(),
                                              self.evaluation_engine(),
                                              InstructionGenerator::new(self.factory.clone()),
                                              self.settings.optimizer_settings());
    let search = optimizer.optimize(job, num_candidates).await;
    self.repo.update_job(job)?;
    search
  }

  pub async fn optimize_examples(&self, job: &mut JobRecord) -> Result<ExampleSearch> {
    let optimizer = ExampleOptimizer::new(self.example_manager(), self.evaluation_engine(), self.settings.optimizer_settings());
    let search = optimizer.optimize(job).await;
    self.repo.update_job(job)?;
    search
  }

  /// Promueve una variante a nueva versión del job y la persiste. Es el
  /// único camino por el que cambia `version`.
  pub fn apply_setting(&self, job: &mut JobRecord, setting: &JobSetting, metrics: Option<&EvalMetrics>) -> Result<u32> {
    if setting.instruction.is_none() && setting.example_ids.is_none() {
      return Err(WorkflowError::Validation("la variante no cambia nada".to_string()));
    }
    let version = job.add_version(setting, metrics.map(EvalMetrics::to_json))?;
    self.repo.update_job(job)?;
    Ok(version)
  }

  pub fn example_manager(&self) -> ExampleManager {
    ExampleManager::new(ExampleGenerator::new(self.factory.clone(), self.voter()),
                        self.settings.example_batch_size,
                        self.settings.max_fill_attempts)
  }

  pub fn evaluation_engine(&self) -> EvaluationEngine {
    EvaluationEngine::new(self.factory.clone(), self.settings.runs_per_input, self.settings.max_workers)
  }

  /// Votador de los ejemplos sintéticos: el consenso configurado o, con el
  /// generador simple, la mayoría por defecto.
  pub(crate) fn voter(&self) -> MajorityVoteGenerator {
    let (num_votes, mode, min_votes) = match &self.settings.generator_type {
      GeneratorKind::Consensus { num_votes,
                                 mode,
                                 min_votes, } => (*num_votes, *mode, *min_votes),
      GeneratorKind::Simple => (5, VoteMode::MajorityVote, 2),
    };
    MajorityVoteGenerator::new(self.factory.clone(), num_votes, mode).with_min_votes(min_votes)
                                                                     .with_max_workers(self.settings.max_workers)
  }
}

impl JobManager<FileJobStorage> {
  /// Servicio sobre el almacenamiento en disco configurado por entorno
  /// (`LLMP_BASE_PATH`, `LLMP_MODEL_NAME`, ...).
  pub fn from_env(factory: Arc<dyn EngineFactory>) -> Result<Self> {
    let repo = job_persistence::new_from_env()?;
    let settings = ProgramSettings { model: EngineOptions::from_env(),
                                     ..ProgramSettings::default() };
    log::debug!("Ajustes de programa: {}", settings.to_json());
    Ok(Self::new(Arc::new(repo), factory, settings))
  }
}
