//! preproc-job CLI
//!
//! Compiles a job file and prints the subjects and pipeline parameters.
//!
//! # Usage
//!
//! ```bash
//! preproc-job study.ini
//! preproc-job study.ini --dataset-dir /mnt/scans/study --format json
//! RUST_LOG=preproc_job=debug preproc-job study.yaml
//! ```

use clap::{Parser, ValueEnum};
use preproc_job::{compile, CompiledJob, FunctionalData};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "preproc-job")]
#[command(about = "Compile a preprocessing job file into subjects and pipeline parameters", long_about = None)]
struct Cli {
    /// Job file (INI, or YAML with a .yaml/.yml extension)
    job: PathBuf,

    /// Dataset root, overriding `dataset_dir` from the job file
    #[arg(short, long)]
    dataset_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Debug logging (unless RUST_LOG is set)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_text(job: &CompiledJob) {
    println!("{}", job.describe());
    let params = job.parameters();
    println!("  dataset root: {}", params.dataset_root.display());
    println!("  output root:  {}", params.output_root.display());

    for subject in job.subjects() {
        println!();
        println!("subject {}", subject.subject_id);
        for ((session, data), out) in subject
            .session_ids
            .iter()
            .zip(&subject.functional_data)
            .zip(&subject.session_output_dirs)
        {
            match data {
                FunctionalData::Single(path) => {
                    println!("  session {}: {}", session, path.display())
                }
                FunctionalData::Volumes(paths) => println!(
                    "  session {}: {} volume(s) in {}",
                    session,
                    paths.len(),
                    data.first()
                        .parent()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default()
                ),
            }
            println!("    -> {}", out.display());
        }
        if let Some(anat) = &subject.anatomical_data {
            println!("  anat: {}", anat.display());
            println!("    -> {}", subject.anatomical_output_dir.display());
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let job = compile(&cli.job, cli.dataset_dir.as_deref())
        .map_err(|e| format!("{}: {}", e.kind(), e))?;

    match cli.format {
        OutputFormat::Text => print_text(&job),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&job).map_err(|e| e.to_string())?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&job).map_err(|e| e.to_string())?;
            print!("{}", yaml);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
