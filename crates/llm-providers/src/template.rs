// template.rs
// Plantillas que el núcleo entrega al motor. `Job` describe la tarea de un
// job concreto; `Builtin` son las plantillas fijas de consenso, evaluación
// e instrucciones.
use crate::engine::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Par de ejemplo incluido en el prompt de un job (few-shot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptExample {
  pub input: JsonObject,
  pub output: JsonObject,
}

/// Prompt de un job: instrucción, esquemas y ejemplos seleccionados.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPrompt {
  pub instruction: Option<String>,
  pub input_schema: String,
  pub output_schema: String,
  pub input_keys: Vec<String>,
  pub output_keys: Vec<String>,
  pub examples: Vec<PromptExample>,
}

/// Plantillas fijas usadas por el núcleo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinTemplate {
  /// Elegir la mejor de varias salidas candidatas.
  FindBest,
  /// Juzgar si una salida coincide con la salida ideal.
  MatchResponse,
  /// Proponer nuevas entradas de ejemplo.
  ExtendInputs,
  /// Variantes de instrucción a partir de pares de ejemplo.
  InstructionVariants,
  /// Instrucción derivada sólo de los esquemas.
  InstructionFromModels,
  /// Instrucción derivada de un par (entrada, salida).
  InstructionFromWorkingOut,
  /// Mutaciones de una instrucción existente.
  MutateInstruction,
  /// Extender una instrucción con el contexto de los esquemas.
  ExtendInstructionByModel,
}

const FIND_BEST: &str = "# Instruction
You are comparing different outputs for a given generation task and must pick the best one.
Return the index of the best output (the first output has index 0) and a step by step reasoning.

# Input
TASK_INSTRUCTION: {task_instruction}
TASK_INPUT: {task_input}
TASK_OUTPUTS: {task_output}
# Output
Index: <int>
Reasoning: <multiline>
";

const MATCH_RESPONSE: &str = "# Instruction
You are comparing a submitted output to an expert output on a given instruction and input.
Ignore differences in style, grammar or punctuation and select one option:
(A) The submission is a subset of the expert output and fully consistent with it.
(B) The submission is a superset of the expert output and fully consistent with it.
(C) The submission contains all the same details as the expert output.
(D) There is a disagreement between the submission and the expert output.
(E) The outputs differ, but the differences don't matter for factuality.

# Input
Instruction: {instruction}
Input: {example_input}
Expert: {ideal_output}
Submission: {output}
---
Reasoning: <str>
Choice: <str, options=[A, B, C, D, E]>
";

const EXTEND_INPUTS: &str = "# Instruction
You create example inputs for a prompt. Extend the list of existing example inputs by {num_examples} items.
Do not repeat existing example inputs.

# Input
Instruction: {instruction}
Number of items: {num_examples}
Existing Example Inputs: {input_example}
# Output
Outputs: <list, rule=(length={num_examples})>
";

const INSTRUCTION_VARIANTS: &str = "# Instruction
You are reverse engineering a prompt instruction from input and output pairs of the same task.
Return {num_instructions} generalized instructions, each trying a different prompt-writing practice.
Do not include details of the concrete inputs.

# Input
Number of instructions: {num_instructions}
Input_output_pairs: {example_set}
---
Instructions: <list, rule=(length={num_instructions})>
";

const INSTRUCTION_FROM_MODELS: &str = "A task takes an input and produces an output. Below are the input and output models of the task.
The instruction was lost. Think step by step about the relationship between the keys and reconstruct it.

# Input
Input Model: {inp_model}
Output Model: {out_model}
---
Reasoning: <str>
Instruction: <str>
";

const INSTRUCTION_FROM_WORKING_OUT: &str = "I gave a friend an instruction. They followed it with the input below and got the correct output.
Work out what the instruction was without mentioning the details of the example.

# Input
Input: {input_object}
Output: {output_object}
---
The Instruction was: <str>
";

const MUTATE_INSTRUCTION: &str = "# Instruction
{mutation_instruction}

# Input
Instruction: {instruction}
Number of Mutations: {num_mutations}
---
Mutated Instructions: <list, rule=(length={num_mutations})>
";

const EXTEND_INSTRUCTION_BY_MODEL: &str = "# Instruction
We reconstructed this task instruction so far: {mutate_instruction}
Using the input and output models below, extend it with the hints a worker would need.

# Input
Input Model: {inp_model}
Output Model: {out_model}
---
Reasoning: <str>
The Instruction Was: <str>
";

impl BuiltinTemplate {
  /// Texto de la plantilla con marcadores `{clave}`.
  pub fn body(&self) -> &'static str {
    match self {
      BuiltinTemplate::FindBest => FIND_BEST,
      BuiltinTemplate::MatchResponse => MATCH_RESPONSE,
      BuiltinTemplate::ExtendInputs => EXTEND_INPUTS,
      BuiltinTemplate::InstructionVariants => INSTRUCTION_VARIANTS,
      BuiltinTemplate::InstructionFromModels => INSTRUCTION_FROM_MODELS,
      BuiltinTemplate::InstructionFromWorkingOut => INSTRUCTION_FROM_WORKING_OUT,
      BuiltinTemplate::MutateInstruction => MUTATE_INSTRUCTION,
      BuiltinTemplate::ExtendInstructionByModel => EXTEND_INSTRUCTION_BY_MODEL,
    }
  }

  /// Claves que el motor espera en la entrada.
  pub fn input_keys(&self) -> &'static [&'static str] {
    match self {
      BuiltinTemplate::FindBest => &["task_instruction", "task_input", "task_output"],
      BuiltinTemplate::MatchResponse => &["instruction", "example_input", "ideal_output", "output"],
      BuiltinTemplate::ExtendInputs => &["instruction", "num_examples", "input_example"],
      BuiltinTemplate::InstructionVariants => &["num_instructions", "example_set"],
      BuiltinTemplate::InstructionFromModels => &["inp_model", "out_model"],
      BuiltinTemplate::InstructionFromWorkingOut => &["input_object", "output_object"],
      BuiltinTemplate::MutateInstruction => &["mutation_instruction", "instruction", "num_mutations"],
      BuiltinTemplate::ExtendInstructionByModel => &["mutate_instruction", "inp_model", "out_model"],
    }
  }

  /// Claves que el motor devuelve en la salida parseada.
  pub fn output_keys(&self) -> &'static [&'static str] {
    match self {
      BuiltinTemplate::FindBest => &["index", "reasoning"],
      BuiltinTemplate::MatchResponse => &["reasoning", "choice"],
      BuiltinTemplate::ExtendInputs => &["outputs"],
      BuiltinTemplate::InstructionVariants => &["instructions"],
      BuiltinTemplate::InstructionFromModels => &["reasoning", "instruction"],
      BuiltinTemplate::InstructionFromWorkingOut => &["the_instruction_was"],
      BuiltinTemplate::MutateInstruction => &["mutated_instructions"],
      BuiltinTemplate::ExtendInstructionByModel => &["reasoning", "the_instruction_was"],
    }
  }
}

/// Plantilla entregada a `EngineFactory::from_template`.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptTemplate {
  Job(JobPrompt),
  Builtin(BuiltinTemplate),
}

impl PromptTemplate {
  pub fn builtin(&self) -> Option<BuiltinTemplate> {
    match self {
      PromptTemplate::Builtin(b) => Some(*b),
      PromptTemplate::Job(_) => None,
    }
  }

  pub fn job(&self) -> Option<&JobPrompt> {
    match self {
      PromptTemplate::Job(p) => Some(p),
      PromptTemplate::Builtin(_) => None,
    }
  }

  /// Claves de salida esperadas por esta plantilla.
  pub fn output_keys(&self) -> Vec<String> {
    match self {
      PromptTemplate::Job(p) => p.output_keys.clone(),
      PromptTemplate::Builtin(b) => b.output_keys().iter().map(|k| k.to_string()).collect(),
    }
  }
}

/// Sustituye los marcadores `{clave}` del cuerpo con los valores de `input`.
/// Los strings se insertan tal cual; el resto como JSON compacto. Los
/// marcadores sin valor se dejan intactos.
pub fn render(body: &str, input: &JsonObject) -> String {
  let mut out = body.to_string();
  for (key, value) in input {
    let text = match value {
      JsonValue::String(s) => s.clone(),
      other => other.to_string(),
    };
    out = out.replace(&format!("{{{}}}", key), &text);
  }
  out
}
