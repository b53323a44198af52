//! Command line front end for patchdesk.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use patchdesk::cli::{self, PatchFormat, Selection};
use patchdesk::query::QuerySpec;

#[derive(Debug, Parser)]
#[command(name = "patchdesk", version, about = "Validate, preview and review JSON Patch operations")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// RFC 6902 with JSON values.
    Rfc6902,
    /// Values encoded as strings.
    Wire,
}

impl From<Format> for PatchFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Rfc6902 => PatchFormat::Rfc6902,
            Format::Wire => PatchFormat::Wire,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate every operation independently against the document.
    Validate {
        document: PathBuf,
        patch: PathBuf,
        #[arg(long, value_enum, default_value = "rfc6902")]
        format: Format,
    },
    /// Print the document with all operations applied.
    Preview {
        document: PathBuf,
        patch: PathBuf,
        #[arg(long, value_enum, default_value = "rfc6902")]
        format: Format,
    },
    /// Accept some operations, reject the rest, and write the result.
    Review {
        document: PathBuf,
        patch: PathBuf,
        #[arg(long, value_enum, default_value = "rfc6902")]
        format: Format,
        /// 1-based operations to accept.
        #[arg(long, value_delimiter = ',', conflicts_with = "all")]
        accept: Vec<usize>,
        /// Accept every valid operation.
        #[arg(long)]
        all: bool,
        /// Write here instead of over the document.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Run JSONPath queries.
    Query {
        document: PathBuf,
        #[arg(required = true)]
        queries: Vec<String>,
        /// Include matched values.
        #[arg(long)]
        values: bool,
    },
    /// Report duplicate and invalid form field names.
    Diagnose { document: PathBuf },
    /// Print a repair prompt, or apply a saved repair response.
    Repair {
        document: PathBuf,
        /// File holding the `<edits>` response to apply.
        #[arg(long)]
        response: Option<PathBuf>,
    },
    /// Resolve a JSON Pointer.
    Pointer { document: PathBuf, pointer: String },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_batch(patch: &Path, format: Format, document: &Path) -> anyhow::Result<patchdesk::json_patch::OperationBatch> {
    cli::read_batch(patch, format.into(), document).with_context(|| format!("loading {}", patch.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let config = cli::load_config(args.config.as_deref())?;

    match args.command {
        Command::Validate { document, patch, format } => {
            let batch = load_batch(&patch, format, &document)?;
            let report = cli::validate_command(&document, &batch)?;
            print_json(&report)?;
            if !report.overall_valid {
                std::process::exit(1);
            }
        }
        Command::Preview { document, patch, format } => {
            let batch = load_batch(&patch, format, &document)?;
            println!("{}", cli::preview_command(&document, &batch, &config)?);
        }
        Command::Review { document, patch, format, accept, all, output } => {
            if !all && accept.is_empty() {
                bail!("pass --all or --accept <N,...>");
            }
            let batch = load_batch(&patch, format, &document)?;
            let selection = if all { Selection::All } else { Selection::Only(accept) };
            let report = cli::review_command(&document, batch, &selection, &config)?;
            match output {
                Some(output) => cli::write_text(&output, &report.text)?,
                None if report.changed => cli::write_text(&document, &report.text)?,
                None => {}
            }
            print_json(&report.statuses)?;
        }
        Command::Query { document, queries, values } => {
            let specs = queries
                .into_iter()
                .map(|q| if values { QuerySpec::new(q).with_values() } else { QuerySpec::new(q) })
                .collect();
            print_json(&cli::query_command(&document, specs, &config)?)?;
        }
        Command::Diagnose { document } => {
            print_json(&cli::diagnose_command(&document, &config)?)?;
        }
        Command::Repair { document, response: None } => {
            println!("{}", cli::repair_prompt(&document, &config)?);
        }
        Command::Repair { document, response: Some(response) } => {
            let response = cli::read_text(&response)?;
            let report = cli::repair_command(&document, &response, &config)?;
            if let Some(text) = &report.text {
                cli::write_text(&document, text)?;
            }
            print_json(&report.outcome)?;
        }
        Command::Pointer { document, pointer } => {
            print_json(&cli::pointer_command(&document, &pointer)?)?;
        }
    }
    Ok(())
}
