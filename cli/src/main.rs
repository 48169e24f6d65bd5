mod commands;
mod output;

use clap::{Parser, Subcommand};
use pbi_schema::ExtractError;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pbi-schema")]
#[command(about = "Extract a normalized schema from Power BI projects")]
#[command(version)]
pub struct Cli {
    #[arg(long, short, global = true, help = "Log extraction details to stderr")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Extract the schema as JSON")]
    Extract {
        #[arg(help = "Project directory, .pbix/.pbit/.zip container, or .bim file")]
        path: String,
        #[arg(long, help = "Emit the raw fragments instead of the normalized model")]
        raw: bool,
        #[arg(long, short, value_name = "FILE", help = "Write JSON to FILE instead of stdout")]
        output: Option<String>,
        #[arg(long, help = "Single-line JSON")]
        compact: bool,
        #[arg(long, value_name = "FILE", help = "Extraction config (JSON)")]
        config: Option<String>,
    },
    #[command(about = "Print a short summary of a project or container")]
    Info {
        #[arg(help = "Project directory, .pbix/.pbit/.zip container, or .bim file")]
        path: String,
        #[arg(long, value_name = "FILE", help = "Extraction config (JSON)")]
        config: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(3)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Extract {
            path,
            raw,
            output,
            compact,
            config,
        } => commands::extract::run(&path, raw, output.as_deref(), compact, config.as_deref()),
        Commands::Info { path, config } => commands::info::run(&path, config.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for_error(&e)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code_for_error(err: &anyhow::Error) -> ExitCode {
    if is_extraction_error(err) {
        ExitCode::from(2)
    } else {
        ExitCode::from(3)
    }
}

fn is_extraction_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<ExtractError>()
            .is_some_and(|e| !matches!(e, ExtractError::InvalidConfig(_)))
    })
}
