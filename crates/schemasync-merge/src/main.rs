//! schemasync CLI
//!
//! Command-line tool for reconciling database schema snapshots into a
//! persisted schema model.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use schemasync_merge::prelude::*;
use schemasync_model::ModelStore;

/// Database schema reverse-engineering and reconciliation.
#[derive(Parser)]
#[command(name = "schemasync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the persisted schema model.
    #[arg(
        short,
        long,
        env = "SCHEMASYNC_MODEL",
        default_value = "schema-model.json"
    )]
    model: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a schema snapshot into the persisted model.
    Import {
        /// Path to the introspected schema snapshot.
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Compare entity and column names case-insensitively.
        #[arg(long)]
        case_insensitive: bool,

        /// Include stored procedures in the comparison.
        #[arg(long)]
        procedures: bool,
    },

    /// Show detected changes without applying them.
    Diff {
        /// Path to the introspected schema snapshot.
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Compare entity and column names case-insensitively.
        #[arg(long)]
        case_insensitive: bool,

        /// Include stored procedures in the comparison.
        #[arg(long)]
        procedures: bool,
    },
}

fn diff_options(case_insensitive: bool, procedures: bool) -> DiffOptions {
    let mut options = DiffOptions::new();
    if case_insensitive {
        options = options.case_insensitive();
    }
    if procedures {
        options = options.with_procedures();
    }
    options
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Import {
            snapshot,
            case_insensitive,
            procedures,
        } => {
            let introspector = SnapshotIntrospector::new(snapshot);
            let store = ModelStore::new(cli.model);
            let mut delegate = NoopDelegate;

            let mut action = ImportAction::new(introspector, store)
                .with_options(diff_options(case_insensitive, procedures));
            let report = action.execute(&mut delegate)?;

            match report.outcome {
                MergeOutcome::InitialImport => {
                    println!("No prior model existed; snapshot saved as the new model.");
                }
                MergeOutcome::NoChanges => println!("No changes to import."),
                MergeOutcome::Complete => {
                    println!("Imported {} change(s).", report.changes.len());
                }
                MergeOutcome::CompleteWithFailures => {
                    println!(
                        "Imported with {} failure(s).",
                        report.failures.failures().len()
                    );
                }
            }

            for (name, value) in &report.changes {
                println!("    {name:<22} {value}");
            }

            if report.failures.has_failures() {
                println!("\nIgnored problem(s):");
                for failure in report.failures.failures() {
                    println!("    {failure}");
                }
            }

            for relationship in &report.removed_relationships {
                println!("Removed dangling relationship: {relationship}");
            }
        }

        Commands::Diff {
            snapshot,
            case_insensitive,
            procedures,
        } => {
            let mut introspector = SnapshotIntrospector::new(snapshot);
            let introspected = introspector.introspect()?;

            let store = ModelStore::new(cli.model);
            let Some(existing) = store.load()? else {
                info!(path = %store.path().display(), "No existing model to compare against");
                println!("No existing model; an import would save the snapshot as-is.");
                return Ok(());
            };

            let differ = SchemaDiff::with_options(diff_options(case_insensitive, procedures));
            let tokens = sort_tokens(differ.diff(&existing, &introspected));

            if tokens.is_empty() {
                println!("No changes detected.");
            } else {
                println!("Detected changes:");
                for token in &tokens {
                    let (name, value) = token.describe();
                    println!("    {name:<22} {value}");
                }
            }
        }
    }

    Ok(())
}
