// job_factory.rs
// Validación de los argumentos de creación y construcción del JobRecord con
// sus ejemplos semilla. No llama al motor: la instrucción derivada y el
// registro los resuelve `JobManager::create_job`.
use crate::errors::{Result, WorkflowError};
use job_domain::{ExampleRecord, IoModel, JobRecord, JsonObject};
use serde_json::Value as JsonValue;

/// Argumentos de creación de un job.
#[derive(Debug, Clone, Default)]
pub struct CreateJobRequest {
  pub job_name: Option<String>,
  pub instruction: Option<String>,
  pub input_model: Option<IoModel>,
  pub output_model: Option<IoModel>,
  pub example_pairs: Vec<(JsonObject, JsonObject)>,
  pub input_examples: Vec<JsonObject>,
  pub output_examples: Vec<JsonObject>,
  pub prompt_template: Option<String>,
  pub input_template: Option<String>,
  pub output_template: Option<String>,
  pub config: Option<JsonValue>,
  pub is_explicit: bool,
}

impl CreateJobRequest {
  pub fn named(job_name: impl Into<String>) -> Self {
    Self { job_name: Some(job_name.into()),
           ..Self::default() }
  }

  pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
    self.instruction = Some(instruction.into());
    self
  }

  pub fn with_models(mut self, input_model: IoModel, output_model: IoModel) -> Self {
    self.input_model = Some(input_model);
    self.output_model = Some(output_model);
    self
  }

  pub fn with_example_pairs(mut self, pairs: Vec<(JsonObject, JsonObject)>) -> Self {
    self.example_pairs = pairs;
    self
  }

  pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
    self.prompt_template = Some(template.into());
    self
  }

  pub fn with_templates(mut self, input_template: impl Into<String>, output_template: impl Into<String>) -> Self {
    self.input_template = Some(input_template.into());
    self.output_template = Some(output_template.into());
    self
  }

  pub fn with_config(mut self, config: JsonValue) -> Self {
    self.config = Some(config);
    self
  }

  pub fn explicit(mut self) -> Self {
    self.is_explicit = true;
    self
  }
}

/// Estrategia de creación: cada una sólo decide los esquemas.
pub trait JobCreator {
  fn models(&self, pairs: &[(JsonObject, JsonObject)]) -> Result<(IoModel, IoModel)>;

  /// Job con los ejemplos semilla (`genesis`, verificados, reales).
  fn create_job(&self,
                job_name: Option<String>,
                instruction: Option<String>,
                pairs: Vec<(JsonObject, JsonObject)>,
                config: Option<JsonValue>)
                -> Result<JobRecord> {
    let (input_model, output_model) = self.models(&pairs)?;
    let mut job = JobRecord::new(job_name, input_model, output_model, instruction);
    if let Some(config) = config {
      job.config = config;
    }
    for (input, output) in pairs {
      job.add_example(ExampleRecord::seed(input, output));
    }
    Ok(job)
  }
}

pub struct ModelJobCreator {
  pub input_model: IoModel,
  pub output_model: IoModel,
}

impl JobCreator for ModelJobCreator {
  fn models(&self, _pairs: &[(JsonObject, JsonObject)]) -> Result<(IoModel, IoModel)> {
    Ok((self.input_model.clone(), self.output_model.clone()))
  }
}

pub struct TemplateJobCreator {
  pub input_template: String,
  pub output_template: String,
}

impl JobCreator for TemplateJobCreator {
  fn models(&self, _pairs: &[(JsonObject, JsonObject)]) -> Result<(IoModel, IoModel)> {
    Ok((IoModel::from_input_template(&self.input_template)?, IoModel::from_output_template(&self.output_template)?))
  }
}

/// Infere los esquemas de la forma de los ejemplos.
pub struct ExampleJobCreator;

impl JobCreator for ExampleJobCreator {
  fn models(&self, pairs: &[(JsonObject, JsonObject)]) -> Result<(IoModel, IoModel)> {
    let inputs: Vec<JsonObject> = pairs.iter().map(|(i, _)| i.clone()).collect();
    let outputs: Vec<JsonObject> = pairs.iter().map(|(_, o)| o.clone()).collect();
    Ok((IoModel::from_examples(&inputs)?, IoModel::from_examples(&outputs)?))
  }
}

/// Secciones de una plantilla de prompt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptSections {
  pub instruction: Option<String>,
  pub input_schema: Option<String>,
  pub output_schema: Option<String>,
}

/// Divide una plantilla en las secciones `# Instruction`, `# Input` y
/// `# Output`. Los encabezados no distinguen mayúsculas; el texto fuera de
/// una sección conocida se ignora.
pub fn extract_sections(template: &str) -> PromptSections {
  #[derive(Clone, Copy)]
  enum Section {
    None,
    Instruction,
    Input,
    Output,
  }

  let mut buffers: [Vec<&str>; 3] = [Vec::new(), Vec::new(), Vec::new()];
  let mut current = Section::None;
  for line in template.lines() {
    let trimmed = line.trim();
    if let Some(heading) = trimmed.strip_prefix('#') {
      current = match heading.trim().to_lowercase().as_str() {
        "instruction" | "instructions" => Section::Instruction,
        "input" => Section::Input,
        "output" => Section::Output,
        _ => current,
      };
      continue;
    }
    match current {
      Section::None => {}
      Section::Instruction => buffers[0].push(line),
      Section::Input => buffers[1].push(line),
      Section::Output => buffers[2].push(line),
    }
  }
  let join = |lines: &Vec<&str>| {
    let text = lines.join("\n").trim().to_string();
    (!text.is_empty()).then_some(text)
  };
  PromptSections { instruction: join(&buffers[0]),
                   input_schema: join(&buffers[1]),
                   output_schema: join(&buffers[2]) }
}

fn invalid(msg: &str) -> WorkflowError {
  WorkflowError::Validation(msg.to_string())
}

/// Valida la combinación de argumentos, elige la estrategia y construye el
/// job. Las combinaciones contradictorias fallan; nunca se mezclan.
pub fn job_factory(request: CreateJobRequest) -> Result<JobRecord> {
  let CreateJobRequest { job_name,
                         mut instruction,
                         input_model,
                         output_model,
                         mut example_pairs,
                         input_examples,
                         output_examples,
                         prompt_template,
                         mut input_template,
                         mut output_template,
                         config,
                         is_explicit, } = request;

  let has_lists = !input_examples.is_empty() || !output_examples.is_empty();
  if has_lists && !example_pairs.is_empty() {
    return Err(invalid("No se pueden usar example_pairs junto con input_examples/output_examples"));
  }
  if has_lists {
    if input_examples.len() != output_examples.len() {
      return Err(WorkflowError::Validation(format!("input_examples ({}) y output_examples ({}) deben tener la misma longitud",
                                                   input_examples.len(),
                                                   output_examples.len())));
    }
    example_pairs = input_examples.into_iter().zip(output_examples).collect();
  }

  if prompt_template.is_some() && (input_template.is_some() || output_template.is_some()) {
    return Err(invalid("No se puede usar prompt_template junto con input_template/output_template"));
  }
  if input_template.is_some() != output_template.is_some() {
    return Err(invalid("input_template y output_template deben indicarse juntos"));
  }
  if let Some(template) = prompt_template {
    let sections = extract_sections(&template);
    if sections.input_schema.is_none() || sections.output_schema.is_none() {
      return Err(invalid("La plantilla debe contener las secciones '# Input' y '# Output'"));
    }
    instruction = sections.instruction.or(instruction);
    input_template = sections.input_schema;
    output_template = sections.output_schema;
  }

  let has_templates = input_template.is_some();
  let has_models = input_model.is_some() || output_model.is_some();
  if has_templates && has_models {
    return Err(invalid("No se pueden usar esquemas explícitos junto con una plantilla"));
  }

  let creator: Box<dyn JobCreator> = match (input_template, output_template, input_model, output_model) {
    (Some(input_template), Some(output_template), _, _) => Box::new(TemplateJobCreator { input_template,
                                                                                        output_template }),
    (_, _, Some(input_model), Some(output_model)) => Box::new(ModelJobCreator { input_model,
                                                                                output_model }),
    (_, _, Some(_), None) | (_, _, None, Some(_)) => {
      return Err(invalid("input_model y output_model deben indicarse juntos"));
    }
    _ if !example_pairs.is_empty() => Box::new(ExampleJobCreator),
    _ => return Err(invalid("Argumentos inválidos para crear un job")),
  };

  let mut job = creator.create_job(job_name, instruction, example_pairs, config)?;
  job.is_explicit = is_explicit;
  Ok(job)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sections_are_split_by_heading() {
    let template = "# Instruction\nClassify the book.\n\n# Input\nBook: {book}\n# Output\nGenre: <str, options=[Fiction, Non-Fiction]>\n";
    let s = extract_sections(template);
    assert_eq!(s.instruction.as_deref(), Some("Classify the book."));
    assert_eq!(s.input_schema.as_deref(), Some("Book: {book}"));
    assert_eq!(s.output_schema.as_deref(), Some("Genre: <str, options=[Fiction, Non-Fiction]>"));
  }

  #[test]
  fn missing_sections_are_none() {
    let s = extract_sections("just text");
    assert_eq!(s, PromptSections::default());
  }
}
