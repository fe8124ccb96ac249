// Helpers de lectura/escritura JSON y JSONL. Un archivo inexistente se lee
// como vacío.
use job_log::{LogError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Directorio `<base>/<idx>` de un job. `idx` debe ser un único componente
/// de ruta.
pub fn job_dir(base: &Path, idx: &str) -> Result<PathBuf> {
  if idx.is_empty() || idx == "." || idx == ".." || idx.contains(['/', '\\']) {
    return Err(LogError::Storage(format!("Identificador de job inválido: '{}'", idx)));
  }
  Ok(base.join(idx))
}

pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
  if !path.exists() {
    return Ok(Vec::new());
  }
  let reader = BufReader::new(fs::File::open(path)?);
  let mut out = Vec::new();
  for (n, line) in reader.lines().enumerate() {
    let line = line?;
    if line.trim().is_empty() {
      continue;
    }
    let item = serde_json::from_str(&line).map_err(|e| LogError::Serialization(format!("{}:{}: {}",
                                                                                        path.display(),
                                                                                        n + 1,
                                                                                        e)))?;
    out.push(item);
  }
  Ok(out)
}

pub fn append_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
  if items.is_empty() {
    return Ok(());
  }
  ensure_parent(path)?;
  let mut file = OpenOptions::new().create(true).append(true).open(path)?;
  for item in items {
    writeln!(file, "{}", serde_json::to_string(item)?)?;
  }
  Ok(())
}

pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
  ensure_parent(path)?;
  let mut buf = String::new();
  for item in items {
    buf.push_str(&serde_json::to_string(item)?);
    buf.push('\n');
  }
  write_atomic(path, buf.as_bytes())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
  if !path.exists() {
    return Ok(None);
  }
  let text = fs::read_to_string(path)?;
  Ok(Some(serde_json::from_str(&text)?))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
  ensure_parent(path)?;
  write_atomic(path, serde_json::to_string_pretty(value)?.as_bytes())
}

fn ensure_parent(path: &Path) -> Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }
  Ok(())
}

// escribe en un temporal y renombra para no dejar documentos a medias
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
  let tmp = path.with_extension("tmp");
  fs::write(&tmp, bytes)?;
  fs::rename(&tmp, path)?;
  Ok(())
}
