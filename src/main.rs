use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use dials::config::{load_declarations, register_declarations, RegistrySettings, StorageBackend};
use dials::{DialRegistry, DialValue};
use log::{info, warn};
use std::path::PathBuf;

/// dials - inspect and edit persisted design dials
#[derive(Parser, Debug)]
#[command(name = "dials")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0")]
    debug: u8,

    /// Project scope (defaults to the settings file, then "default")
    #[arg(short = 'p', long = "project", value_name = "ID")]
    project: Option<String>,

    /// Store file to use instead of the configured one
    #[arg(short = 's', long = "store", value_name = "PATH")]
    store: Option<PathBuf>,

    /// JSON file of dial declarations to register before the command runs
    #[arg(long = "declarations", value_name = "FILE")]
    declarations: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every dial with its type and current value
    List,
    /// List dials by group
    Groups,
    /// Print the current value of a dial
    Get { id: String },
    /// Set and persist a dial value
    Set { id: String, value: String },
    /// Restore a dial to its default
    Reset { id: String },
    /// Restore every dial to its default
    ResetAll,
    /// Print current values as JSON
    Export {
        /// Print full registrations instead of values
        #[arg(long)]
        dials: bool,
    },
    /// Erase all stored overrides for the scope
    Clear,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logger with verbosity based on -d/--debug flag
    // Level 0 (default): warn only
    // Level 1: info
    // Level 2: debug
    // Level 3+: trace
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Allow RUST_LOG to override CLI setting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let registry = open_registry(&cli)?;

    if let Some(path) = &cli.declarations {
        let declarations = load_declarations(path)?;
        for (id, e) in register_declarations(&registry, &declarations) {
            warn!("Declaration '{}' rejected: {}", id, e);
        }
    }

    match cli.command {
        Command::List => list(&registry),
        Command::Groups => {
            for (group, dials) in registry.get_dials_by_group() {
                println!("{}:", group);
                for dial in dials {
                    println!("  {:<24} {}", dial.id, dial.current_value);
                }
            }
        }
        Command::Get { id } => {
            let value = registry
                .get_value(&id)
                .ok_or_else(|| anyhow!("Unknown dial '{}'", id))?;
            println!("{}", value);
        }
        Command::Set { id, value } => {
            let dial = registry
                .get_dial(&id)
                .ok_or_else(|| anyhow!("Unknown dial '{}' (declare it with --declarations)", id))?;
            let parsed = DialValue::parse(dial.dial_type, &value)
                .ok_or_else(|| anyhow!("'{}' is not a valid {} value", value, dial.dial_type))?;
            registry.set_value(&id, parsed)?;
            info!("Set '{}' to {}", id, value);
        }
        Command::Reset { id } => {
            if !registry.reset(&id) {
                return Err(anyhow!("Unknown dial '{}'", id));
            }
        }
        Command::ResetAll => registry.reset_all(),
        Command::Export { dials } => {
            let json = if dials {
                serde_json::to_value(registry.export_dials())?
            } else {
                registry.export_json()
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Command::Clear => {
            registry.clear_storage();
            println!("Cleared stored overrides");
        }
    }

    registry.flush_notifications();
    Ok(())
}

/// Build the registry from the settings file and command-line overrides
fn open_registry(cli: &Cli) -> Result<DialRegistry> {
    let mut settings = RegistrySettings::try_load().context("Failed to load settings")?;
    if let Some(project) = &cli.project {
        settings = settings.with_project_id(project.clone());
    }
    if let Some(store) = &cli.store {
        settings.storage = StorageBackend::File;
        settings.storage_path = Some(store.clone());
    }

    let registry = settings.build_registry();
    if !registry.is_persistent() {
        warn!("No dial store available; changes will not be saved");
    }
    Ok(registry)
}

fn list(registry: &DialRegistry) {
    for dial in registry.get_all_dials() {
        let marker = if dial.is_overridden() { "*" } else { " " };
        println!(
            "{} {:<24} {:<8} {}",
            marker, dial.id, dial.dial_type, dial.current_value
        );
    }

    // Overrides stored for dials this run did not declare
    for id in registry.persisted_ids() {
        if !registry.contains(&id) {
            println!("? {:<24} (undeclared)", id);
        }
    }
}
