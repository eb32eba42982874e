//! taskflow command-line entry point.

use anyhow::{Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use taskflow::cli::{Cli, Command};
use taskflow::config::{Config, ConfigPaths};
use taskflow::db::Database;
use taskflow::format::{
    OutputFormat, format_error_json, format_rows_markdown, format_seed_markdown,
    format_stats_markdown, to_json,
};
use taskflow::logging::{self, LogTarget};
use taskflow::manager::Taxonomies;
use taskflow::projection::project;
use taskflow::seed::seed_defaults;
use taskflow::stats::TaskStats;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let format = cli.format;

    match start(cli).await {
        Ok(output) => {
            print!("{output}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if format == OutputFormat::Json => {
            println!("{}", format_error_json(&err)?);
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err),
    }
}

async fn start(cli: Cli) -> Result<String> {
    let config_path = cli.config.as_deref().map(Path::new);
    let mut config = Config::resolve(config_path, &ConfigPaths::discover())?;
    if let Some(db_path) = &cli.database {
        config.store.db_path = PathBuf::from(db_path);
    }

    logging::init(&LogTarget::parse(&cli.log), cli.verbose, &config.logging.level)?;
    match &config.source {
        Some(path) => debug!(path = %path.display(), "Loaded config"),
        None => debug!("No config file, using defaults"),
    }
    debug!(db_path = %config.store.db_path.display(), "Configuration resolved");

    config.ensure_db_dir()?;
    let db = Arc::new(Database::open(&config.store.db_path)?);
    let taxonomies = Taxonomies::new(Arc::clone(&db));
    taxonomies.ready().await?;

    run(cli.command, cli.format, &taxonomies).await
}

fn print_id(format: OutputFormat, action: &str, id: &str) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => to_json(&serde_json::json!({ "action": action, "id": id }))? + "\n",
        OutputFormat::Markdown => format!("{action} `{id}`\n"),
    })
}

async fn run(command: Command, format: OutputFormat, taxonomies: &Taxonomies<Database>) -> Result<String> {
    match command {
        Command::List { kind, search } => {
            let collection = taxonomies.get(kind);
            if let Some(err) = collection.error() {
                bail!(err);
            }
            let rows = project(&collection.list(), search.as_deref());
            Ok(match format {
                OutputFormat::Json => to_json(&rows)? + "\n",
                OutputFormat::Markdown => format_rows_markdown(kind, &rows),
            })
        }
        Command::Add { kind, fields } => {
            let id = taxonomies.get(kind).add(fields.into_new()).await?;
            print_id(format, "added", &id)
        }
        Command::Update { kind, id, fields } => {
            taxonomies.get(kind).update(&id, fields.into_patch()).await?;
            print_id(format, "updated", &id)
        }
        Command::Remove { kind, id } => {
            taxonomies.get(kind).remove(&id).await?;
            print_id(format, "removed", &id)
        }
        Command::Move { kind, id, direction } => {
            let moved = taxonomies.get(kind).move_entity(&id, direction).await?;
            if !moved {
                info!(%kind, %id, %direction, "Nothing to move");
            }
            Ok(match format {
                OutputFormat::Json => {
                    to_json(&serde_json::json!({ "id": id, "direction": direction, "moved": moved }))? + "\n"
                }
                OutputFormat::Markdown if moved => format!("moved `{id}` {direction}\n"),
                OutputFormat::Markdown => format!("`{id}` cannot move {direction}\n"),
            })
        }
        Command::Seed => {
            let report = seed_defaults(taxonomies).await?;
            Ok(match format {
                OutputFormat::Json => to_json(&report)? + "\n",
                OutputFormat::Markdown => format_seed_markdown(&report),
            })
        }
        Command::Stats { statuses, priorities } => {
            let stats = TaskStats::collect(
                &taxonomies.statuses.list(),
                &taxonomies.priorities.list(),
                statuses.iter().map(String::as_str),
                priorities.iter().map(String::as_str),
            );
            Ok(match format {
                OutputFormat::Json => to_json(&stats)? + "\n",
                OutputFormat::Markdown => format_stats_markdown(&stats),
            })
        }
    }
}
