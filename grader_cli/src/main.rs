//! # Girder Grader CLI
//!
//! Thin command-line front end over a gradebook file.
//!
//! ```text
//! grader_cli submit  <gradebook.json> <reference.json> <student_id> <stage> <payload.json>
//! grader_cli status  <gradebook.json> <reference.json> <student_id>
//! grader_cli results <gradebook.json> <student_id>
//! ```
//!
//! Output is JSON on stdout. Logging goes to stderr and is controlled by
//! `RUST_LOG` (default `info`).

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use grader_core::config::GraderConfig;
use grader_core::reference::{ReferenceData, ReferenceStore};
use grader_core::store::{AnswerStore, FileAnswerStore};
use grader_core::{GradeError, GradeResult, Grader, StudentId};
use serde::Serialize;
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "\
usage:
  grader_cli submit  <gradebook.json> <reference.json> <student_id> <stage> <payload.json>
  grader_cli status  <gradebook.json> <reference.json> <student_id>
  grader_cli results <gradebook.json> <student_id>

environment:
  GRADER_CONFIG  optional TOML file with tolerances and geometry limits
  GRADER_USER    name written into the gradebook lock file";

fn operator() -> String {
    std::env::var("GRADER_USER")
        .or_else(|_| std::env::var("USER"))
        .unwrap_or_else(|_| "grader_cli".to_string())
}

fn load_config() -> GradeResult<GraderConfig> {
    match std::env::var("GRADER_CONFIG") {
        Ok(path) => GraderConfig::load(Path::new(&path)),
        Err(_) => GraderConfig::embedded(),
    }
}

fn read_payload(path: &Path) -> GradeResult<Value> {
    let contents = fs::read_to_string(path)
        .map_err(|e| GradeError::file_error("read payload", path.display().to_string(), e.to_string()))?;
    serde_json::from_str(&contents).map_err(GradeError::serialization)
}

fn print_json(value: &impl Serialize) -> GradeResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(GradeError::serialization)?;
    println!("{}", json);
    Ok(())
}

fn open_grader(gradebook: &str, reference: &str) -> GradeResult<Grader<ReferenceData, FileAnswerStore>> {
    let reference = ReferenceData::load(Path::new(reference))?;
    let store = FileAnswerStore::open(Path::new(gradebook), operator())?;
    Ok(Grader::new(reference, store, load_config()?))
}

fn run(args: &[String]) -> GradeResult<bool> {
    let arg = |i: usize| args.get(i).map(String::as_str);
    match (arg(0), args.len()) {
        (Some("submit"), 6) => {
            let student: StudentId = args[3].parse()?;
            let payload = read_payload(Path::new(&args[5]))?;
            let grader = open_grader(&args[1], &args[2])?;
            let outcome = grader.submit_stage(student, &args[4], payload)?;
            print_json(&outcome)?;
            Ok(outcome.ok)
        }
        (Some("status"), 4) => {
            let student: StudentId = args[3].parse()?;
            let grader = open_grader(&args[1], &args[2])?;
            let name = grader.reference().get_student(student)?.full_name;
            let gate = grader.answer_store().get_gate_state(student)?;
            let unlocked: Vec<&str> = gate.unlocked_stages().iter().map(|s| s.as_str()).collect();
            print_json(&json!({
                "student_id": student,
                "full_name": name,
                "max_unlocked_block": gate.max_unlocked_block,
                "finished": gate.finished,
                "unlocked_stages": unlocked,
            }))?;
            Ok(true)
        }
        (Some("results"), 3) => {
            let student: StudentId = args[2].parse()?;
            let store = FileAnswerStore::open(Path::new(&args[1]), operator())?;
            let results: Value = store
                .get_stage_results(student)?
                .into_iter()
                .map(|(stage, result)| (stage.to_string(), json!(result.fields)))
                .collect::<serde_json::Map<String, Value>>()
                .into();
            print_json(&results)?;
            Ok(true)
        }
        _ => {
            eprintln!("{}", USAGE);
            Ok(false)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!();
                eprintln!("Error JSON:");
                eprintln!("{}", json);
            }
            ExitCode::FAILURE
        }
    }
}
