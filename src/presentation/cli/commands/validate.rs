use crate::infrastructure::filesystem::config_store::ConfigStore;
use anyhow::Context;
use colored::Colorize;

pub async fn execute(config: &str) -> anyhow::Result<()> {
    let store = ConfigStore::new(config);
    let registry = store
        .load()
        .await
        .with_context(|| format!("loading registry {}", config))?;

    println!("{} {}", "Registry:".bold(), config);
    for (name, project) in registry.iter() {
        let kind = project.repository.scm.to_string();
        let revision = project
            .revision
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "(none)".to_string());
        let mut notes = Vec::new();
        if project.dependency_only {
            notes.push("dependency-only".to_string());
        }
        if !project.dependencies.is_empty() {
            notes.push(format!("deps: {}", project.dependencies.join(", ")));
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!(" [{}]", notes.join("; "))
        };

        println!(
            "  {} {} ({}, at {}){}",
            "•".green(),
            name.bold(),
            kind,
            revision,
            notes
        );
    }

    println!("\n{} {} project(s)", "OK".green().bold(), registry.len());
    Ok(())
}
