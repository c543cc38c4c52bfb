//! `stagewise` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate`: check a stage manifest and print the execution order.
//! - `render`: draw the dependency diagram (DOT, Mermaid or JSON).
//! - `run`: dry-run the manifest's stages in order.

mod manifest;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use stagewise::{DiagramConfig, DiagramFormat, Direction, EngineError, Workflow};

use crate::manifest::{parse_host_value, Manifest};

#[derive(Parser)]
#[command(
    name = "stagewise",
    about = "Validate, render and dry-run stage dependency graphs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a stage manifest and print the execution order.
    Validate {
        /// Path to the manifest JSON file.
        #[arg(env = "STAGEWISE_MANIFEST")]
        path: PathBuf,
    },
    /// Render the dependency diagram of a manifest.
    Render {
        #[arg(env = "STAGEWISE_MANIFEST")]
        path: PathBuf,
        /// dot, mermaid or json.
        #[arg(long, default_value = "dot")]
        format: DiagramFormat,
        /// Lay the diagram out left to right instead of top down.
        #[arg(long)]
        horizontal: bool,
        /// Write to this file instead of stdout; the extension is added when missing.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Run the manifest's stages in order with logging-only actions.
    Run {
        #[arg(env = "STAGEWISE_MANIFEST")]
        path: PathBuf,
        /// Host value visible to every stage, as key=value (repeatable).
        #[arg(long = "set", value_parser = parse_host_value)]
        values: Vec<(String, serde_json::Value)>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<EngineError>() {
                Some(engine) => eprintln!("❌ [{}] {e:#}", engine.code()),
                None => eprintln!("❌ {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Validate { path } => {
            let manifest = Manifest::load(&path)?;
            let title = manifest.title().to_string();
            let workflow = manifest.into_workflow()?;
            let order: Vec<&str> = workflow.order().into_iter().map(String::as_str).collect();
            println!("✅ Workflow '{title}' is valid. Execution order: {order:?}");
        }
        Command::Render {
            path,
            format,
            horizontal,
            output,
        } => {
            let workflow = Manifest::load(&path)?.into_workflow()?;
            let config = diagram_config(horizontal);

            match output {
                Some(out) => {
                    let written = write_output(&workflow, &out, format, &config)?;
                    println!("wrote {}", written.display());
                }
                None => print!("{}", workflow.graph().render(format, &config)?),
            }
        }
        Command::Run { path, values } => {
            let manifest = Manifest::load(&path)?;
            let title = manifest.title().to_string();
            let workflow = manifest.into_workflow()?;
            let host: HashMap<String, serde_json::Value> = values.into_iter().collect();

            info!("running workflow '{}' ({} stages)", title, workflow.len());
            if let Err(e) = workflow.work(&host) {
                error!("workflow '{}' aborted: {}", title, e);
                return Err(e.into());
            }
            println!("✅ Workflow '{title}' completed");
        }
    }
    Ok(())
}

fn diagram_config(horizontal: bool) -> DiagramConfig {
    DiagramConfig {
        direction: if horizontal {
            Direction::LeftRight
        } else {
            Direction::TopDown
        },
        ..DiagramConfig::default()
    }
}

/// Write the diagram to `out`; the format's extension is appended when missing.
fn write_output(
    workflow: &Workflow<String>,
    out: &Path,
    format: DiagramFormat,
    config: &DiagramConfig,
) -> anyhow::Result<PathBuf> {
    let dir = out.parent().map(Path::to_path_buf).unwrap_or_default();
    let name = out
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("invalid output path {}", out.display()))?;
    Ok(workflow.write_diagram(dir, name, format, config)?)
}
