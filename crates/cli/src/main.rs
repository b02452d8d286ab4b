//! Operator CLI over a JSON fixture of users, areas and records.

mod commands;
mod fixture;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use volunteerdesk_infra::Settings;
use volunteerdesk_observability::LogFormat;

use crate::commands::Resource;
use crate::fixture::Fixture;

/// Volunteer desk authorization tooling
#[derive(Parser)]
#[command(name = "volunteerdesk")]
#[command(about = "Inspect and maintain a volunteer desk fixture", long_about = None)]
struct Cli {
    /// Fixture file with users, areas and records
    #[arg(long, env = "VOLUNTEERDESK_FIXTURE", default_value = "fixture.json")]
    fixture: PathBuf,

    /// Log output format (json or pretty)
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Explain whether a user may perform an action on a resource
    Explain {
        /// Acting username; omit for an anonymous request
        #[arg(long = "as")]
        actor: Option<String>,
        /// read, read_deleted, create, update, delete, restore or purge
        action: String,
        #[arg(value_enum)]
        resource: Resource,
        /// Record id (a username is accepted for users)
        id: Option<String>,
    },

    /// Validate and import users from a JSON row file
    Import {
        #[arg(long = "as")]
        actor: String,
        rows: PathBuf,
        /// Write the created users back into the fixture
        #[arg(long)]
        write: bool,
    },

    /// List users assigned to unknown or inactive work areas
    AuditAreas,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    volunteerdesk_observability::tracing::init(cli.log_format, "warn");

    let settings = Settings::from_env().context("invalid configuration")?;
    let mediator = Fixture::load(&cli.fixture)?.into_mediator(settings)?;

    let output = match cli.command {
        Commands::Explain {
            actor,
            action,
            resource,
            id,
        } => {
            let ctx = commands::context_for(&mediator, actor.as_deref())?;
            let target = commands::resolve_target(&mediator, resource, id.as_deref())?;
            commands::explain(&mediator, &ctx, &action, &target)?
        }
        Commands::Import { actor, rows, write } => {
            let ctx = commands::context_for(&mediator, Some(&actor))?;
            let raw = fs::read_to_string(&rows)
                .with_context(|| format!("failed to read rows {}", rows.display()))?;
            let report = commands::import(&mediator, &ctx, commands::parse_rows(&raw)?)?;
            if write && report.committed() {
                Fixture::from_mediator(&mediator).save(&cli.fixture)?;
            }
            serde_json::to_value(report)?
        }
        Commands::AuditAreas => serde_json::to_value(commands::audit_areas(&mediator))?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
