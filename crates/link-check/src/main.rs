//! Azure Boards link check service and CLI.
//!
//! Run `link-check --help` for usage information.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use link_check::{config::Config, server};
use workitems::{validate, Conclusion, StrictnessPolicy, ValidationOutcome};

#[derive(Parser)]
#[command(name = "link-check")]
#[command(about = "Require PR descriptions to reference linked Azure Boards work items")]
#[command(version)]
struct Cli {
    /// Log format: text, json
    #[arg(long, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook service
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
    },

    /// Validate a PR description locally
    Check {
        /// File containing the description (reads stdin when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// PR state; anything other than `open` skips validation
        #[arg(short, long)]
        state: Option<String>,

        /// Fail while any reference is still unlinked (also enabled by
        /// PASS_REQUIRES_ALL_LINKED_WORKITEMS=true)
        #[arg(long)]
        strict: bool,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("link_check=info,workitems=info,tower_http=info")
        })
    };

    match cli.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer().with_target(false))
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
    }

    match cli.command {
        Commands::Serve { port } => {
            let mut config = Config::default();
            if let Some(port) = port {
                config.port = port;
            }
            server::run_server(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check {
            file,
            state,
            strict,
            format,
        } => {
            let body = read_description(file.as_ref())?;
            let policy = check_policy(strict, &Config::default());
            let passed = run_check(
                &body,
                state.as_deref(),
                policy,
                format,
                &mut std::io::stdout().lock(),
            )?;

            Ok(if passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn read_description(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read description from stdin")?;
            Ok(body)
        }
    }
}

/// Strict when either the flag or the service configuration asks for it.
fn check_policy(strict: bool, config: &Config) -> StrictnessPolicy {
    StrictnessPolicy::from(strict || config.require_all_linked)
}

/// Validate a description and print the outcome; `false` on a failing verdict.
fn run_check(
    body: &str,
    state: Option<&str>,
    policy: StrictnessPolicy,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<bool> {
    let outcome = validate(Some(body), state, policy);
    print_outcome(&outcome, format, out)?;
    Ok(outcome.conclusion != Conclusion::Failure)
}

fn print_outcome(
    outcome: &ValidationOutcome,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(outcome)?)?,
        OutputFormat::Text => {
            writeln!(out, "{}: {}", outcome.conclusion, outcome.title)?;
            writeln!(out)?;
            writeln!(out, "{}", outcome.summary)?;
        }
    }
    Ok(())
}
