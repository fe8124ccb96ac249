use job_domain::{JobLookup, JobRepository};
use std::error::Error;
use std::io::{self, Write};

/// Pequeño menú interactivo para inspeccionar los jobs guardados en disco
/// (`LLMP_BASE_PATH`, por defecto `./data/jobs`).
///
/// Opciones soportadas:
/// 1) Ver registro (clave -> id de job)
/// 2) Ver job (nombre, id o io_hash)
/// 3) Ver bitácora de eventos
/// 4) Ver bitácora de generaciones
/// 5) Eliminar job
/// 6) Salir
fn main() -> Result<(), Box<dyn Error>> {
    let repo = job_persistence::new_from_env().map_err(|e| Box::new(e) as Box<dyn Error>)?;

    loop {
        println!("\n== LLMP CLI menu ==");
        println!("1) Ver registro de jobs");
        println!("2) Ver job");
        println!("3) Ver bitácora de eventos");
        println!("4) Ver bitácora de generaciones");
        println!("5) Eliminar job");
        println!("6) Salir");
        print!("Elige una opción: ");
        io::stdout().flush().ok();

        let mut choice = String::new();
        io::stdin().read_line(&mut choice)?;
        match choice.trim() {
            "1" => match repo.registry() {
                Ok(registry) => {
                    println!("\nCLAVE                                                            | JOB");
                    println!("-----------------------------------------------------------------------------------------------------");
                    for (key, idx) in registry {
                        println!("{:<64} | {}", key, idx);
                    }
                }
                Err(e) => eprintln!("Error leyendo el registro: {}", e),
            },
            "2" => {
                let key = prompt("Nombre, id o io_hash del job: ")?;
                match resolve(&repo, key.trim()).and_then(|idx| repo.load_job(&idx)) {
                    Ok(job) => {
                        println!("\nid:          {}", job.idx);
                        println!("nombre:      {}", job.job_name.as_deref().unwrap_or("<sin nombre>"));
                        println!("versión:     {}", job.version);
                        println!("explícito:   {}", job.is_explicit);
                        println!("io_hash:     {}", job.io_hash());
                        println!("instrucción: {}", job.instruction.as_deref().unwrap_or("-"));
                        println!("-- entrada --\n{}", job.input_model);
                        println!("-- salida --\n{}", job.output_model);
                        println!("-- ejemplos ({}) --", job.example_records.len());
                        for record in &job.example_records {
                            println!("{}  {} -> {}",
                                     record,
                                     serde_json::Value::Object(record.input().clone()),
                                     serde_json::Value::Object(record.output().clone()));
                        }
                    }
                    Err(e) => eprintln!("No se pudo cargar el job: {}", e),
                }
            }
            "3" => {
                let key = prompt("Nombre, id o io_hash del job: ")?;
                match resolve(&repo, key.trim()).and_then(|idx| repo.load_event_log(&idx)) {
                    Ok(events) => {
                        println!("\nTIMESTAMP                        | TIPO              | VERSIÓN | EVENTO");
                        for ev in events {
                            let version = ev.job_version.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
                            println!("{} | {:<17} | {:<7} | {}", ev.timestamp.to_rfc3339(), ev.event_type, version, ev.event_id);
                        }
                    }
                    Err(e) => eprintln!("Error leyendo eventos: {}", e),
                }
            }
            "4" => {
                let key = prompt("Nombre, id o io_hash del job: ")?;
                match resolve(&repo, key.trim()).and_then(|idx| repo.load_generation_log(&idx)) {
                    Ok(entries) => {
                        for entry in entries {
                            println!("{} | {} -> {}", entry.event_id, entry.input, entry.output);
                        }
                    }
                    Err(e) => eprintln!("Error leyendo generaciones: {}", e),
                }
            }
            "5" => {
                let key = prompt("Job a eliminar (nombre, id o io_hash): ")?;
                let idx = match resolve(&repo, key.trim()) {
                    Ok(idx) => idx,
                    Err(e) => {
                        eprintln!("{}", e);
                        continue;
                    }
                };
                let confirm = prompt(&format!("Confirma borrado de {}? escribir 'yes' para confirmar: ", idx))?;
                if confirm.trim().to_lowercase() == "yes" {
                    match repo.delete_job(&idx) {
                        Ok(()) => println!("Job eliminado: {}", idx),
                        Err(e) => eprintln!("Error eliminando job: {}", e),
                    }
                } else {
                    println!("Borrado cancelado");
                }
            }
            "6" => {
                println!("Saliendo...");
                break;
            }
            other => {
                println!("Opción inválida: {}", other);
            }
        }
    }

    Ok(())
}

/// Un id de job tiene 32 dígitos hexadecimales; cualquier otra cosa se busca
/// en el registro (nombre o io_hash).
fn resolve(repo: &impl JobRepository, key: &str) -> Result<String, job_domain::DomainError> {
    if key.len() == 32 && key.chars().all(|c| c.is_ascii_hexdigit()) {
        return repo.resolve(&JobLookup::Idx(key.to_string()));
    }
    repo.resolve(&JobLookup::Name(key.to_string()))
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}
