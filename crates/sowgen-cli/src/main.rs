//! sowgen CLI - SOW pricing workbook and document generation

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use sowgen::prelude::*;
use sowgen::{load_patch, BuildReport};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Reference data picked up from the working directory when `--reference` is absent
const DEFAULT_REFERENCE: &str = "data/sow-reference-data.json";

#[derive(Parser)]
#[command(name = "sowgen")]
#[command(
    author,
    version,
    about = "Generate SOW pricing workbooks and Statement of Work documents"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Reference data JSON (rates, picklists, deliverables)
    #[arg(long, global = true)]
    reference: Option<PathBuf>,

    /// Hourly rate for roles missing from the reference data
    #[arg(long, global = true)]
    default_rate: Option<Decimal>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a pricing workbook from a JSON specification
    Workbook {
        /// Input specification (json)
        input: PathBuf,

        /// Output workbook
        output: PathBuf,

        /// Base workbook whose Formulas, Picklist and INSTRUCTIONS sheets are kept
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// Copy a pricing workbook, applying changes from a patch file
    Clone {
        /// Source workbook
        source: PathBuf,

        /// Output workbook
        output: PathBuf,

        /// Patch with the fields to change (default: plain copy)
        #[arg(long = "json")]
        patch: Option<PathBuf>,
    },

    /// Render a Statement of Work from a workbook or JSON specification
    #[command(alias = "doc")]
    Document {
        /// Source workbook or specification (xlsx, json)
        input: PathBuf,

        /// Output document (docx, or json with --json-only)
        output: PathBuf,

        /// Scope text overrides
        #[arg(long)]
        scope: Option<PathBuf>,

        /// Template document (default: built-in template)
        #[arg(long)]
        template: Option<PathBuf>,

        /// Document date (default: pricing date, else today)
        #[arg(long)]
        date: Option<String>,

        /// Write the resolved content as JSON instead of a document
        #[arg(long)]
        json_only: bool,
    },

    /// Print the content model read from a workbook or specification
    Extract {
        /// Source workbook or specification (xlsx, json)
        input: PathBuf,

        /// Output JSON file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let reference = load_reference(cli.global.reference.as_deref())?;
    let options = BuildOptions {
        default_rate: cli.global.default_rate,
    };

    match cli.command {
        Commands::Workbook {
            input,
            output,
            template,
        } => build_workbook(
            &input,
            &output,
            WorkbookOptions { template },
            &reference,
            options,
        ),
        Commands::Clone {
            source,
            output,
            patch,
        } => clone(&source, &output, patch.as_deref(), &reference, &options),
        Commands::Document {
            input,
            output,
            scope,
            template,
            date,
            json_only,
        } => document(
            &input,
            &output,
            scope.as_deref(),
            DocumentOptions { template, date },
            json_only,
            &reference,
            options,
        ),
        Commands::Extract { input, output } => {
            extract(&input, output.as_deref(), &reference, options)
        }
    }
}

fn load_reference(path: Option<&Path>) -> Result<ReferenceData> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_REFERENCE);
            if !default.exists() {
                eprintln!("Warning: no reference data; every rate uses the fallback policy");
                return Ok(ReferenceData::default());
            }
            default
        }
    };
    ReferenceData::load(&path)
        .with_context(|| format!("Failed to load reference data '{}'", path.display()))
}

fn build(input: &Path, reference: &ReferenceData, options: BuildOptions) -> Result<BuildReport> {
    let report = Builder::new(reference, options)
        .from_path(input)
        .with_context(|| format!("Failed to read '{}'", input.display()))?;
    print_warnings(&report.warnings);
    Ok(report)
}

fn print_warnings<W: std::fmt::Display>(warnings: &[W]) {
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }
}

fn build_workbook(
    input: &Path,
    output: &Path,
    workbook_options: WorkbookOptions,
    reference: &ReferenceData,
    options: BuildOptions,
) -> Result<()> {
    let report = build(input, reference, options)?;
    write_workbook_with(&report.model, reference, &workbook_options, output)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;

    let totals = report.model.totals();
    eprintln!(
        "Wrote '{}' ({} resources, {} hours, ${})",
        output.display(),
        report.model.resources.len(),
        sowgen::money::format_hours(totals.total_hours),
        sowgen::money::format_money(totals.total_fees)
    );
    Ok(())
}

fn clone(
    source: &Path,
    output: &Path,
    patch: Option<&Path>,
    reference: &ReferenceData,
    options: &BuildOptions,
) -> Result<()> {
    let patch = match patch {
        Some(path) => load_patch(path)
            .with_context(|| format!("Failed to load patch '{}'", path.display()))?,
        None => ContentPatch::default(),
    };

    let outcome = clone_workbook(source, output, &patch, reference, options)
        .with_context(|| format!("Failed to clone '{}'", source.display()))?;

    match outcome {
        CloneOutcome::Copied => eprintln!("Copied '{}' to '{}'", source.display(), output.display()),
        CloneOutcome::Patched { cells } => eprintln!(
            "Wrote '{}' ({} cells updated)",
            output.display(),
            cells
        ),
        CloneOutcome::Rebuilt { warnings } => {
            print_warnings(&warnings);
            eprintln!("Rebuilt '{}' from '{}'", output.display(), source.display());
        }
    }
    Ok(())
}

fn document(
    input: &Path,
    output: &Path,
    scope: Option<&Path>,
    doc_options: DocumentOptions,
    json_only: bool,
    reference: &ReferenceData,
    options: BuildOptions,
) -> Result<()> {
    let report = build(input, reference, options)?;
    let overrides = match scope {
        Some(path) => ScopeOverrides::load(path)
            .with_context(|| format!("Failed to load scope overrides '{}'", path.display()))?,
        None => ScopeOverrides::default(),
    };

    if json_only {
        write_document_json(&report.model, &overrides, &doc_options, output)
            .with_context(|| format!("Failed to write '{}'", output.display()))?;
        eprintln!("Wrote document content to '{}'", output.display());
        return Ok(());
    }

    let rendered = write_document(&report.model, &overrides, &doc_options, output)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;
    for token in &rendered.unresolved {
        eprintln!("Warning: no value for placeholder '{{{}}}'", token);
    }
    eprintln!("Wrote '{}'", output.display());
    Ok(())
}

fn extract(
    input: &Path,
    output: Option<&Path>,
    reference: &ReferenceData,
    options: BuildOptions,
) -> Result<()> {
    let report = build(input, reference, options)?;
    let json = serde_json::to_string_pretty(&report.model).context("Failed to serialize model")?;

    if let Some(output_path) = output {
        write_atomically(output_path, format!("{}\n", json).as_bytes())
            .with_context(|| format!("Failed to write '{}'", output_path.display()))?;
        eprintln!("Wrote model to '{}'", output_path.display());
    } else {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", json).context("Failed to write to stdout")?;
    }
    Ok(())
}

/// Write through a temp file in the target directory, then rename over `path`
fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_atomically_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "a much longer previous model that must not leak through").unwrap();

        write_atomically(&path, b"{}\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_write_atomically_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("model.json");
        assert!(write_atomically(&path, b"{}").is_err());
        assert!(!path.exists());
    }
}
