use job_domain::{DomainStubs, FieldType, JsonObject, VerificationType};
use job_workflow::factory::job_factory;
use job_workflow::{CreateJobRequest, WorkflowError};
use serde_json::{json, Value as JsonValue};

fn obj(v: JsonValue) -> JsonObject {
  v.as_object().cloned().expect("object literal")
}

fn assert_invalid(request: CreateJobRequest) {
  match job_factory(request) {
    Err(WorkflowError::Validation(_)) => {}
    Err(other) => panic!("se esperaba error de validación, llegó: {other}"),
    Ok(job) => panic!("se esperaba error de validación, se creó {}", job.idx),
  }
}

#[test]
fn conflicting_or_incomplete_arguments_fail_fast() {
  let (input, output) = DomainStubs::sentiment_models();
  let pair = (obj(json!({"text": "a"})), obj(json!({"sentiment": "positive"})));

  // pares y listas a la vez
  let mut both = CreateJobRequest::named("x").with_example_pairs(vec![pair.clone()]);
  both.input_examples = vec![obj(json!({"text": "b"}))];
  both.output_examples = vec![obj(json!({"sentiment": "negative"}))];
  assert_invalid(both);

  // listas de distinta longitud
  let mut uneven = CreateJobRequest::named("x");
  uneven.input_examples = vec![obj(json!({"text": "b"})), obj(json!({"text": "c"}))];
  uneven.output_examples = vec![obj(json!({"sentiment": "negative"}))];
  assert_invalid(uneven);

  // plantilla completa junto con plantillas sueltas
  assert_invalid(CreateJobRequest::named("x").with_prompt_template("# Input\nText: {text}\n# Output\nLabel: <str>")
                                             .with_templates("Text: {text}", "Label: <str>"));

  // plantilla sin su pareja
  let mut lone = CreateJobRequest::named("x");
  lone.input_template = Some("Text: {text}".into());
  assert_invalid(lone);

  // esquemas explícitos junto con plantillas
  assert_invalid(CreateJobRequest::named("x").with_models(input.clone(), output.clone())
                                             .with_templates("Text: {text}", "Label: <str>"));

  // un solo esquema
  let mut half = CreateJobRequest::named("x");
  half.input_model = Some(input);
  assert_invalid(half);

  // nada con qué construir
  assert_invalid(CreateJobRequest::named("x"));
}

#[test]
fn prompt_template_supplies_instruction_and_schemas() {
  let template = "# Instruction\nClassify the book genre.\n# Input\nBook: {book}\n# Output\nGenre: <str, options=[Fiction, Non-Fiction]>";
  let job = job_factory(CreateJobRequest::named("books").with_prompt_template(template)).expect("job");
  assert_eq!(job.instruction.as_deref(), Some("Classify the book genre."));
  assert_eq!(job.input_model.keys(), vec!["book".to_string()]);
  assert_eq!(job.output_model.fields[0].options,
             Some(vec!["Fiction".to_string(), "Non-Fiction".to_string()]));
}

#[test]
fn example_lists_are_zipped_into_seed_examples() {
  let mut request = CreateJobRequest::named("counts");
  request.input_examples = vec![obj(json!({"text": "a b"})), obj(json!({"text": "c"}))];
  request.output_examples = vec![obj(json!({"words": 2, "ratio": 0.5})), obj(json!({"words": 1, "ratio": 1.0}))];
  let job = job_factory(request).expect("job");

  assert_eq!(job.example_records.len(), 2);
  // los objetos JSON iteran sus claves ordenadas
  assert_eq!(job.output_model.keys(), vec!["ratio".to_string(), "words".to_string()]);
  assert_eq!(job.output_model.fields[0].field_type, FieldType::Float);
  assert_eq!(job.output_model.fields[1].field_type, FieldType::Integer);
  let seed = &job.example_records[0];
  assert_eq!(seed.gen_event_id.as_deref(), Some("genesis"));
  assert_eq!(seed.verification_type, Some(VerificationType::HumanVerified));
  assert!(job.instruction.is_none());
}

#[test]
fn duplicate_seed_inputs_are_kept_once() {
  let pair = (obj(json!({"text": "a"})), obj(json!({"sentiment": "positive"})));
  let job = job_factory(CreateJobRequest::named("dups").with_example_pairs(vec![pair.clone(), pair])).expect("job");
  assert_eq!(job.example_records.len(), 1);
}
