pub mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process::exit;

/// chimps-smoker - poll source repositories and smoke-test changed projects
#[derive(Parser)]
#[command(name = "chimps-smoker")]
#[command(about = "Poll source repositories and smoke-test changed projects")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll the configured projects and smoke new revisions
    Smoke {
        /// Project registry file
        #[arg(short, long, default_value = "smoker.yml")]
        config: String,

        /// Report collector endpoint; reports are discarded when absent
        #[arg(short, long)]
        server: Option<String>,

        /// Number of polling iterations (unbounded when omitted)
        #[arg(short, long)]
        iterations: Option<u64>,

        /// Seconds to sleep between iterations
        #[arg(long)]
        sleep: Option<u64>,

        /// Checkout directory (a scratch directory when omitted)
        #[arg(short, long)]
        workdir: Option<String>,

        /// Advance a project's revision even when a dependency broke
        /// the attempt
        #[arg(long)]
        advance_on_dependency_failure: bool,

        /// Projects to smoke (all non-dependency-only projects when
        /// omitted)
        projects: Vec<String>,
    },

    /// Check the registry file and list the configured projects
    Validate {
        /// Project registry file
        #[arg(short, long, default_value = "smoker.yml")]
        config: String,
    },
}

/// CLI application runner
pub struct CliApp {
    cli: Cli,
}

impl CliApp {
    pub fn new() -> Self {
        Self { cli: Cli::parse() }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        // Set up colored output
        if !self.cli.no_color {
            colored::control::set_override(true);
        } else {
            colored::control::set_override(false);
        }

        match self.handle_command().await {
            Ok(_) => Ok(()),
            Err(e) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
                exit(1);
            }
        }
    }

    async fn handle_command(&self) -> anyhow::Result<()> {
        match &self.cli.command {
            Commands::Smoke {
                config,
                server,
                iterations,
                sleep,
                workdir,
                advance_on_dependency_failure,
                projects,
            } => {
                commands::smoke::execute(commands::smoke::SmokeArgs {
                    config: config.clone(),
                    server: server.clone(),
                    iterations: *iterations,
                    sleep: *sleep,
                    workdir: workdir.clone(),
                    advance_on_dependency_failure: *advance_on_dependency_failure,
                    projects: projects.clone(),
                    verbose: self.cli.verbose,
                })
                .await
            }
            Commands::Validate { config } => commands::validate::execute(config).await,
        }
    }
}

impl Default for CliApp {
    fn default() -> Self {
        Self::new()
    }
}
