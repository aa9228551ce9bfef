//! Worker Harness - run test programs in isolated workers
//!
//! A CLI that dispatches named test programs to single-threaded workers and
//! reports the status messages they send back.
//!
//! ## Usage
//!
//! ```bash
//! # Run one program and stream its output
//! worker-harness run --exe Echo --script good.mod -- hello world
//!
//! # Run a file of requests on four workers
//! worker-harness batch --file runs.yaml --workers 4
//!
//! # Speak newline-delimited JSON on stdin/stdout
//! worker-harness serve
//!
//! # List built-in modules
//! worker-harness list --detailed
//! ```

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::BufReader;
use tracing::{debug, info, warn};

use worker_harness::cli::{self, Args, Command};
use worker_harness::config::{load_requests, print_env_help, ConfigFile, EnvConfig, HarnessConfig};
use worker_harness::executor::{serve_lines, WorkerError, WorkerHandle, WorkerPool};
use worker_harness::models::Outcome;
use worker_harness::output::{OutputFormat, ResultFormatter};
use worker_harness::programs::builtin_catalog;
use worker_harness::protocol::{LaunchRequest, StatusMessage, Transcript};
use worker_harness::utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    // config commands must work even when the current file is invalid
    let command = match args.command {
        Command::Config(config_args) => {
            init_logger(if args.verbose {
                LogLevel::Debug
            } else {
                LogLevel::Info
            });
            return manage_config(config_args, args.config.as_deref(), &env);
        }
        command => command,
    };

    let mut file = load_config(args.config.as_deref(), &env)?;
    file.harness.apply_env(&env);
    file.harness.validate()?;
    let config = file.harness;

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        LogLevel::from_str(&config.log_level).unwrap_or(LogLevel::Info)
    };
    init_logger(level);
    debug!("Effective configuration: {:?}", config);

    let success = match command {
        Command::Run(run_args) => run_one(&config, run_args).await?,
        Command::Batch(batch_args) => run_batch(&config, batch_args).await?,
        Command::Serve(serve_args) => {
            serve(&config, serve_args).await?;
            true
        }
        Command::List(list_args) => {
            list_programs(list_args);
            true
        }
        Command::Schema(schema_args) => {
            print_schema(schema_args)?;
            true
        }
        Command::Config(_) => unreachable!("config commands return early"),
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

/// Explicit path, then `WORKER_HARNESS_CONFIG`, then the standard locations
fn load_config(path: Option<&Path>, env: &EnvConfig) -> Result<ConfigFile> {
    match path {
        Some(path) => ConfigFile::load(path),
        None => match &env.config_file {
            Some(path) => ConfigFile::load(path),
            None => ConfigFile::load_default(),
        },
    }
}

fn output_format(requested: Option<&str>, config: &HarnessConfig) -> Result<OutputFormat> {
    let name = requested.unwrap_or(&config.format);
    OutputFormat::from_str(name).ok_or_else(|| anyhow::anyhow!("Unknown output format: {name}"))
}

fn ready_timeout(requested: Option<u64>, config: &HarnessConfig) -> Option<Duration> {
    requested.map(Duration::from_secs).or_else(|| config.ready_timeout())
}

async fn shutdown_worker(worker: WorkerHandle) -> Result<()> {
    tokio::task::spawn_blocking(move || worker.shutdown())
        .await
        .context("Worker shutdown task failed")??;
    Ok(())
}

async fn run_one(config: &HarnessConfig, args: cli::RunArgs) -> Result<bool> {
    let formatter = ResultFormatter::new(output_format(args.format.as_deref(), config)?);
    let timeout = ready_timeout(args.ready_timeout, config);

    let request = args
        .scripts
        .iter()
        .fold(LaunchRequest::new(&args.exe), |request, script| {
            request.with_script(script)
        })
        .with_args(args.args);

    info!("Running {}", request);
    let worker = WorkerHandle::spawn(0, Arc::new(builtin_catalog()), timeout)?;

    let started_at = Utc::now();
    let start = Instant::now();
    let mut run = worker.launch(request.clone())?;
    let mut transcript = Transcript::new();

    let mut stdout = std::io::stdout();
    while let Some(message) = run.next().await {
        print!("{}", formatter.format_message(&message));
        stdout.flush().context("Failed to flush stdout")?;
        transcript.push(message);
    }
    drop(run);
    let duration_ms = start.elapsed().as_millis() as u64;

    let outcome = if transcript.is_complete() {
        if let Err(violation) = transcript.validate() {
            warn!("Worker broke the message ordering: {}", violation);
        }
        Outcome::from_parts(
            &request.exe,
            started_at,
            duration_ms,
            transcript.saw_ready(),
            transcript.exception().map(str::to_string),
        )
    } else {
        Outcome::error(
            &request.exe,
            started_at,
            duration_ms,
            WorkerError::Disconnected(worker.id()).to_string(),
        )
    };

    println!("{}", formatter.format_outcome(&outcome));
    shutdown_worker(worker).await?;

    Ok(outcome.status.is_success())
}

async fn run_batch(config: &HarnessConfig, args: cli::BatchArgs) -> Result<bool> {
    let formatter = ResultFormatter::new(output_format(args.format.as_deref(), config)?);
    let timeout = ready_timeout(args.ready_timeout, config);
    let workers = args.workers.unwrap_or(config.workers);

    let requests = load_requests(&args.file)?;
    if requests.is_empty() {
        warn!("No launch requests in {}", args.file.display());
    }

    let pool = WorkerPool::new(workers, Arc::new(builtin_catalog()), timeout)?;
    let summary = pool.run_batch(requests).await;

    println!("{}", formatter.format_summary(&summary));

    tokio::task::spawn_blocking(move || pool.shutdown())
        .await
        .context("Worker shutdown task failed")??;

    Ok(summary.is_all_passed())
}

/// One JSON launch request per stdin line; status messages as stdout lines
async fn serve(config: &HarnessConfig, args: cli::ServeArgs) -> Result<()> {
    let timeout = ready_timeout(args.ready_timeout, config);
    let worker = WorkerHandle::spawn(0, Arc::new(builtin_catalog()), timeout)?;

    info!("Serving launch requests on stdin");
    let mut stdout = tokio::io::stdout();
    serve_lines(&worker, BufReader::new(tokio::io::stdin()), &mut stdout).await?;

    shutdown_worker(worker).await
}

fn list_programs(args: cli::ListArgs) {
    let catalog = builtin_catalog();

    println!("\nBuilt-in modules ({} total)\n", catalog.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for module in catalog.modules() {
        if args.detailed {
            println!("\n{}:", module.id());
            println!("──────────────────────────────────────────────────────────────────────");
            for name in module.export_names() {
                println!("  - {name}");
            }
        } else {
            println!("  {:12} {}", module.id(), module.export_names().join(", "));
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
}

fn print_schema(args: cli::SchemaArgs) -> Result<()> {
    let launch = schemars::schema_for!(LaunchRequest);
    let status = schemars::schema_for!(StatusMessage);

    let output = match args.message.as_str() {
        "launch" => serde_json::to_string_pretty(&launch)?,
        "status" => serde_json::to_string_pretty(&status)?,
        "all" => {
            let both = BTreeMap::from([("launch", launch), ("status", status)]);
            serde_json::to_string_pretty(&both)?
        }
        other => anyhow::bail!("Unknown message: {other} (expected launch, status or all)"),
    };
    println!("{output}");
    Ok(())
}

fn manage_config(args: cli::ConfigArgs, path: Option<&Path>, env: &EnvConfig) -> Result<()> {
    match args.action {
        cli::ConfigAction::Show => {
            let mut file = load_config(path, env)?;
            file.harness.apply_env(env);
            println!("{}", serde_yaml::to_string(&file)?);
            if env.has_any() {
                env.print_summary();
            }
        }

        cli::ConfigAction::Init { path, force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {}. Use --force to overwrite.",
                    path.display()
                );
            }
            ConfigFile::new(HarnessConfig::default()).save(&path)?;
            println!("✓ Configuration file created: {}", path.display());
        }

        cli::ConfigAction::Validate { file } => {
            let file = file.or_else(|| path.map(Path::to_path_buf)).or_else(ConfigFile::find);
            let Some(file) = file else {
                anyhow::bail!("No configuration file found");
            };

            match ConfigFile::load(&file) {
                Ok(_) => println!("✓ Configuration file is valid: {}", file.display()),
                Err(e) => {
                    println!("✗ Configuration file is invalid: {}", file.display());
                    println!("  Error: {e:#}");
                    return Err(e);
                }
            }
        }

        cli::ConfigAction::Env => {
            print_env_help();
            println!();
            env.print_summary();
        }
    }

    Ok(())
}
