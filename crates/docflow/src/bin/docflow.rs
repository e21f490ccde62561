//! Command-line front end. Every command runs the pipeline in-process
//! against the configured database and object store.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use docflow::config::{load_or_default, Config, LogFormat};
use docflow::model::{Identity, JobParams, JobStatus, Operation};
use docflow::runtime::{Components, Runtime};
use docflow::submission::{SubmitError, SubmitRequest, UploadedFile, WaitError};
use docflow::DocflowError;

#[derive(Parser)]
#[command(name = "docflow", version, about = "Asynchronous document-processing pipeline")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, env = "DOCFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides `logging.format` from the config
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormatArg>,

    /// Overrides `logging.level` from the config
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Submit files for processing and run the job to completion
    Submit {
        /// to-jpg, to-png, to-pdf, compress, merge or split
        operation: Operation,

        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Page ranges for split, e.g. `1-3,5`
        #[arg(long)]
        pages: Option<String>,

        /// JPEG quality (1-100)
        #[arg(long)]
        quality: Option<u8>,

        /// Rasterisation resolution for PDF to image
        #[arg(long)]
        dpi: Option<u32>,

        /// Wait up to SECS for a terminal status and print the job
        #[arg(long, value_name = "SECS")]
        wait: Option<u64>,

        /// User id recorded on the job
        #[arg(long, env = "DOCFLOW_USER")]
        user: Option<String>,
    },

    /// Show one job
    Status { job_id: String },

    /// List jobs, newest first
    Jobs {
        #[arg(long)]
        status: Option<JobStatus>,

        #[arg(long, default_value_t = 20)]
        limit: u64,
    },

    /// List artifact records, newest first
    Artifacts {
        /// Only the artifacts of this job
        #[arg(long)]
        job: Option<String>,

        #[arg(long)]
        limit: Option<u64>,
    },

    /// Run workers and the reconciler until Ctrl-C
    Serve,
}

#[derive(Debug)]
enum CliError {
    Docflow(DocflowError),
    Submit(SubmitError),
    Wait(WaitError),
    Input(String),
    JobFailed(String),
}

impl From<DocflowError> for CliError {
    fn from(e: DocflowError) -> Self {
        CliError::Docflow(e)
    }
}

impl From<SubmitError> for CliError {
    fn from(e: SubmitError) -> Self {
        CliError::Submit(e)
    }
}

impl From<WaitError> for CliError {
    fn from(e: WaitError) -> Self {
        CliError::Wait(e)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("docflow: {}", e);
            return ExitCode::from(2);
        }
    };
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
    }
    if let Some(level) = cli.log_level.clone() {
        config.logging.level = level;
    }
    if let Err(e) = docflow::telemetry::init(&config.logging) {
        eprintln!("docflow: {}", e);
        return ExitCode::from(2);
    }

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Submit(e)) => {
            print_json(&e.to_body());
            ExitCode::from(if e.status_code() == 500 { 1 } else { 2 })
        }
        Err(CliError::Input(message)) => {
            eprintln!("docflow: {}", message);
            ExitCode::from(2)
        }
        Err(CliError::JobFailed(job_id)) => {
            eprintln!("docflow: job {} failed", job_id);
            ExitCode::FAILURE
        }
        Err(CliError::Wait(e)) => {
            eprintln!("docflow: {}", e);
            ExitCode::FAILURE
        }
        Err(CliError::Docflow(e)) => {
            eprintln!("docflow: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &Config) -> Result<(), CliError> {
    let components = Components::from_config(config)?;

    match command {
        Command::Submit {
            operation,
            files,
            pages,
            quality,
            dpi,
            wait,
            user,
        } => {
            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                let file = UploadedFile::from_path(path)
                    .map_err(|e| CliError::Input(format!("cannot read '{}': {}", path.display(), e)))?;
                uploads.push(file);
            }

            let mut request = SubmitRequest::new(operation, uploads).with_params(JobParams {
                page_ranges: pages,
                quality,
                dpi,
            });
            if let Some(user_id) = user {
                request = request.with_identity(Identity {
                    user_id,
                    roles: Vec::new(),
                });
            }

            let runtime = Runtime::start(components, &config.worker)?;
            let service = runtime.submission();
            let accepted = match service.submit_job(request) {
                Ok(accepted) => accepted,
                Err(e) => {
                    runtime.shutdown();
                    return Err(e.into());
                }
            };

            let Some(secs) = wait else {
                print_json(&accepted);
                runtime.shutdown();
                return Ok(());
            };

            let waited = service.wait_for_terminal(&accepted.job_id, Duration::from_secs(secs));
            runtime.shutdown();
            let job = waited?;
            print_json(&job);
            if job.status == JobStatus::Failed {
                return Err(CliError::JobFailed(job.id));
            }
            Ok(())
        }

        Command::Status { job_id } => {
            let job = components.submission().get_job(&job_id)?;
            print_json(&job);
            Ok(())
        }

        Command::Jobs { status, limit } => {
            let jobs = components.submission().list_jobs(status, limit)?;
            print_json(&jobs);
            Ok(())
        }

        Command::Artifacts { job, limit } => {
            let service = components.submission();
            let artifacts = match job {
                Some(job_id) => service.job_artifacts(&job_id)?,
                None => service.list_artifacts(limit)?,
            };
            print_json(&artifacts);
            Ok(())
        }

        Command::Serve => serve(components, config),
    }
}

fn serve(components: Components, config: &Config) -> Result<(), CliError> {
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .map_err(|e| CliError::Input(format!("cannot install Ctrl-C handler: {}", e)))?;

    let runtime = Runtime::start(components, &config.worker)?;

    log::info!("docflow serving; press Ctrl-C to stop");
    let _ = stop_rx.recv();

    runtime.shutdown();
    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("docflow: cannot render output: {}", e),
    }
}
