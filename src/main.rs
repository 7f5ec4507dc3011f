//! Vault CLI
//!
//! Command-line client for administering a Vault server. Currently ships the
//! `seal` command.

use clap::{error::ErrorKind, Parser, Subcommand};
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod api;
mod commands;
mod config;
mod meta;
mod tls;
mod ui;

use commands::{seal::SealCommand, Command};
use config::ConfigLoader;
use meta::{HttpClientFactory, Meta};
use ui::{ConsoleUi, Ui};

#[derive(Parser)]
#[command(name = "vault")]
#[command(about = "Command-line client for a Vault server", version)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seals the vault server
    #[command(disable_help_flag = true)]
    Seal {
        /// Flags for the command, parsed by the command itself
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("VAULT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if !std::io::stderr().is_terminal() {
        colored::control::set_override(false);
    }

    let ui: Arc<dyn Ui> = Arc::new(ConsoleUi);
    let code = run(ui, ConfigLoader::system(), std::env::args().skip(1).collect()).await;

    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

async fn run(ui: Arc<dyn Ui>, loader: ConfigLoader, args: Vec<String>) -> i32 {
    // Go-style top-level help spelling
    let args = args
        .into_iter()
        .enumerate()
        .map(|(i, arg)| if i == 0 && arg == "-help" { "--help".to_string() } else { arg });

    let cli = match Cli::try_parse_from(std::iter::once("vault".to_string()).chain(args)) {
        Ok(cli) => cli,
        Err(e) => {
            let text = e.render().to_string();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    ui.output(text.trim_end());
                    0
                }
                _ => {
                    ui.error(text.trim_end());
                    1
                }
            };
        }
    };

    match cli.command {
        Commands::Seal { args } => {
            tracing::debug!(?args, "dispatching seal");
            let meta = Meta::new(ui, HttpClientFactory, loader);
            SealCommand::new(meta).run(args).await
        }
    }
}
