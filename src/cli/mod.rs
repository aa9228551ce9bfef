//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run test programs in isolated workers and report their lifecycle
#[derive(Parser, Debug)]
#[command(name = "worker-harness")]
#[command(version)]
#[command(about = "Dispatch test programs to isolated workers and stream their status")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one test program and stream its status
    Run(RunArgs),

    /// Run a file of launch requests across a worker pool
    Batch(BatchArgs),

    /// Read launch requests from stdin, write status messages to stdout
    Serve(ServeArgs),

    /// List built-in modules and the programs they export
    List(ListArgs),

    /// Print JSON Schema for the wire messages
    Schema(SchemaArgs),

    /// Inspect or create configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Name of the test program to run
    #[arg(short, long)]
    pub exe: String,

    /// Resource ids to load before resolving, in order
    #[arg(short, long = "script")]
    pub scripts: Vec<String>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Seconds to wait for readiness
    #[arg(long)]
    pub ready_timeout: Option<u64>,

    /// Arguments passed to the test program
    #[arg(last = true)]
    pub args: Vec<String>,
}

/// Arguments for batch command
#[derive(Parser, Debug)]
pub struct BatchArgs {
    /// YAML or JSON file of launch requests
    #[arg(short = 'i', long)]
    pub file: PathBuf,

    /// Number of workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Seconds to wait for readiness
    #[arg(long)]
    pub ready_timeout: Option<u64>,
}

/// Arguments for serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Seconds to wait for readiness
    #[arg(long)]
    pub ready_timeout: Option<u64>,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show exported program names per module
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for schema command
#[derive(Parser, Debug)]
pub struct SchemaArgs {
    /// Which message to describe (launch, status)
    #[arg(default_value = "all")]
    pub message: String,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Destination path
        #[arg(default_value = "./worker-harness.yaml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check a configuration file
    Validate {
        /// File to check; defaults to the first one found
        file: Option<PathBuf>,
    },

    /// Show supported environment variables
    Env,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args() {
        let args = Args::parse_from([
            "worker-harness",
            "run",
            "--exe",
            "Echo",
            "-s",
            "good.mod",
            "--format",
            "json",
            "--",
            "a",
            "b",
        ]);
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.exe, "Echo");
                assert_eq!(run.scripts, vec!["good.mod"]);
                assert_eq!(run.format.as_deref(), Some("json"));
                assert_eq!(run.args, vec!["a", "b"]);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_batch_args_with_global_config() {
        let args = Args::parse_from([
            "worker-harness",
            "batch",
            "--file",
            "runs.yaml",
            "-w",
            "4",
            "--config",
            "harness.json",
            "-v",
        ]);
        assert!(args.verbose);
        assert_eq!(args.config, Some(PathBuf::from("harness.json")));
        match args.command {
            Command::Batch(batch) => {
                assert_eq!(batch.file, PathBuf::from("runs.yaml"));
                assert_eq!(batch.workers, Some(4));
            }
            _ => panic!("Expected Batch command"),
        }
    }

    #[test]
    fn test_config_init_default_path() {
        let args = Args::parse_from(["worker-harness", "config", "init"]);
        match args.command {
            Command::Config(ConfigArgs {
                action: ConfigAction::Init { path, force },
            }) => {
                assert_eq!(path, PathBuf::from("./worker-harness.yaml"));
                assert!(!force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
