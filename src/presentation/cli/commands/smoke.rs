use crate::application::use_cases::smoke_projects::{SmokeConfig, SmokeOrchestrator};
use crate::domain::entities::smoke_result::ProjectState;
use crate::infrastructure::filesystem::config_store::ConfigStore;
use crate::infrastructure::report::HttpReportSender;
use anyhow::Context;
use colored::Colorize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::info;

/// Arguments for the smoke command
pub struct SmokeArgs {
    pub config: String,
    pub server: Option<String>,
    pub iterations: Option<u64>,
    pub sleep: Option<u64>,
    pub workdir: Option<String>,
    pub advance_on_dependency_failure: bool,
    pub projects: Vec<String>,
    pub verbose: bool,
}

pub async fn execute(args: SmokeArgs) -> anyhow::Result<()> {
    let store = ConfigStore::new(&args.config);
    let registry = store
        .load()
        .await
        .with_context(|| format!("loading registry {}", args.config))?;

    println!(
        "{} {} project(s) from {}",
        "Loaded".green().bold(),
        registry.len(),
        args.config
    );

    let mut config = SmokeConfig::new()
        .with_advance_on_dependency_failure(args.advance_on_dependency_failure);
    if let Some(workdir) = &args.workdir {
        config = config.with_workdir(workdir);
    }
    if let Some(sleep) = args.sleep {
        config = config.with_sleep(Duration::from_secs(sleep));
    }

    let mut orchestrator = SmokeOrchestrator::new(store, registry, config)?;

    if let Some(server) = &args.server {
        let sender = HttpReportSender::from_str(server)?;
        orchestrator = orchestrator.with_sender(Box::new(sender));
        info!(server = %server, "reports will be uploaded");
    }

    if args.verbose {
        println!("Working directory: {}", orchestrator.workdir().display());
    }

    // Interrupt stops the loop between projects; dropping the
    // orchestrator removes the scratch checkout directory.
    let shutdown = orchestrator.shutdown_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupt received, finishing current project");
            shutdown.store(true, Ordering::SeqCst);
        }
    });

    let selection = if args.projects.is_empty() {
        None
    } else {
        Some(args.projects.as_slice())
    };

    let summary = orchestrator.smoke(args.iterations, selection).await?;

    println!();
    for (project, state) in &summary.attempts {
        match state {
            ProjectState::NoChange => {
                println!("  {} {}: no new revision", "-".dimmed(), project);
            }
            ProjectState::DependencyOnly => {
                if args.verbose {
                    println!("  {} {}: dependency only", "-".dimmed(), project);
                }
            }
            ProjectState::Reported { revision, sent } => {
                let mark = if *sent { "✓".green() } else { "✓".yellow() };
                println!("  {} {}: smoked {} (report {})", mark, project, revision,
                    if *sent { "sent" } else { "not sent" });
            }
            ProjectState::Done { revision } => {
                println!("  {} {}: smoked {}", "✓".green(), project, revision);
            }
            ProjectState::BuildFailed { revision } => {
                println!("  {} {}: build failed at {}", "✗".red(), project, revision);
            }
            ProjectState::DependencyFailed { dependency } => {
                println!(
                    "  {} {}: dependency {} failed",
                    "✗".red(),
                    project,
                    dependency
                );
            }
            ProjectState::Errored { message } => {
                println!("  {} {}: {}", "✗".red().bold(), project, message);
            }
        }
    }

    println!(
        "\n{} {} iteration(s), {} tested, {} failed",
        "Finished".green().bold(),
        summary.iterations,
        summary.tested_count(),
        summary.failed_count()
    );

    Ok(())
}
