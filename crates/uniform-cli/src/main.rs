mod cmd;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "uniform-pipelines",
    about = "Assemble deployment plans and post-process pipeline templates",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the pipeline plan for a contained stack and print it as JSON
    Plan {
        /// Name of the contained application stack
        #[arg(long)]
        stack_name: String,

        /// Version of the contained application stack
        #[arg(long)]
        stack_version: String,

        /// Deployment plan YAML (default: the standard three-stage plan)
        #[arg(long)]
        plan_file: Option<PathBuf>,

        /// Directory probed for the smoke-test collection (default: .)
        #[arg(long)]
        source_dir: Option<PathBuf>,
    },

    /// Run the changeset renaming macro over a macro event
    RenameChangesets {
        /// Event JSON file (default: stdin)
        #[arg(long)]
        event: Option<PathBuf>,
    },

    /// Run the role reassignment macro over a macro event
    TransformRoles {
        /// Event JSON file (default: stdin)
        #[arg(long)]
        event: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Plan {
            stack_name,
            stack_version,
            plan_file,
            source_dir,
        } => cmd::plan::run(
            &stack_name,
            &stack_version,
            plan_file.as_deref(),
            source_dir.as_deref(),
        ),
        Commands::RenameChangesets { event } => cmd::macros::run_rename_changesets(event.as_deref()),
        Commands::TransformRoles { event } => cmd::macros::run_transform_roles(event.as_deref()),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
