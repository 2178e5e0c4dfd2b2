//! fwmap - field mappings for firmware configuration headers
//!
//! Usage:
//!   fwmap generate --config "new configs/marlin/2.1.x/Configuration.h"
//!   fwmap generate --scan --scan-dir "new configs" --firmware th3d
//!   fwmap annotate --config Configuration.h --mapping-dir assets/data/maps/marlin/2.1.x
//!   fwmap coverage --config Configuration.h --config Configuration_adv.h \
//!     --mapping-dir assets/data/maps/marlin/2.1.x --output coverage.json

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fwmap::{
    annotate_documents, coverage_report, discover_headers, find_documents, generate_batch,
    write_report, Annotator, BatchReport, HeaderJob, MappingConfig, MappingTables, ScanFilter,
};
use fwmap_header::parse_header_file;

#[derive(Parser, Debug)]
#[command(name = "fwmap", version)]
#[command(about = "Generate and maintain field mappings for firmware configuration headers")]
struct Cli {
    /// Lookup tables (TOML) replacing the built-in ones
    #[arg(long, global = true)]
    tables: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate core and full mapping documents
    Generate {
        /// Single header to process
        #[arg(long, required_unless_present = "scan", conflicts_with = "scan")]
        config: Option<PathBuf>,

        /// Process every <scan-dir>/<firmware>/<version>/*.h header
        #[arg(long)]
        scan: bool,

        /// Root of the header tree for --scan
        #[arg(long, default_value = "new configs")]
        scan_dir: PathBuf,

        /// Firmware name (filter with --scan)
        #[arg(long)]
        firmware: Option<String>,

        /// Firmware version (filter with --scan)
        #[arg(long)]
        version: Option<String>,

        /// Root of the output tree
        #[arg(long, default_value = "assets/data/maps")]
        output_dir: PathBuf,

        /// Line budget per written part
        #[arg(long, default_value_t = 900)]
        max_lines: usize,

        /// Largest header to read, in bytes
        #[arg(long)]
        max_file_size: Option<usize>,

        /// Skip UI field binding
        #[arg(long)]
        no_ui: bool,

        /// Print the batch report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-apply header facts to existing mapping documents
    Annotate {
        /// Header the documents were generated from
        #[arg(long)]
        config: PathBuf,

        /// Directory holding the mapping documents
        #[arg(long)]
        mapping_dir: PathBuf,

        /// Glob pattern relative to --mapping-dir
        #[arg(long, default_value = "**/*.json")]
        pattern: String,

        /// Skip UI field binding
        #[arg(long)]
        no_ui: bool,
    },

    /// Report header macros that no mapping document references
    Coverage {
        /// Headers to check (repeatable)
        #[arg(long, required = true)]
        config: Vec<PathBuf>,

        /// Directory holding the mapping documents
        #[arg(long)]
        mapping_dir: PathBuf,

        /// Glob pattern relative to --mapping-dir
        #[arg(long, default_value = "**/*.json")]
        pattern: String,

        /// Also write the report here (JSON for .json, text otherwise)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let tables = load_tables(cli.tables.as_deref())?;

    match cli.command {
        Command::Generate {
            config,
            scan,
            scan_dir,
            firmware,
            version,
            output_dir,
            max_lines,
            max_file_size,
            no_ui,
            json,
        } => {
            let mut base = MappingConfig::default()
                .with_output_dir(output_dir)
                .with_max_lines(max_lines)
                .with_ui_binding(!no_ui);
            if let Some(size) = max_file_size {
                base = base.with_max_file_size(size);
            }

            let jobs = if scan {
                scan_jobs(&scan_dir, firmware, version)?
            } else {
                let path = config.context("--config is required without --scan")?;
                vec![HeaderJob {
                    firmware: firmware.unwrap_or(base.firmware.clone()),
                    version: version.unwrap_or(base.version.clone()),
                    path,
                }]
            };
            run_generate(&jobs, &base, &tables, json)
        }
        Command::Annotate {
            config,
            mapping_dir,
            pattern,
            no_ui,
        } => run_annotate(&config, &mapping_dir, &pattern, !no_ui, &tables),
        Command::Coverage {
            config,
            mapping_dir,
            pattern,
            output,
        } => run_coverage(&config, &mapping_dir, &pattern, output.as_deref(), &tables),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_tables(path: Option<&Path>) -> Result<MappingTables> {
    match path {
        Some(path) => MappingTables::load(path)
            .with_context(|| format!("Failed to load tables from {}", path.display())),
        None => MappingTables::builtin().context("Built-in tables are invalid"),
    }
}

fn scan_jobs(
    scan_dir: &Path,
    firmware: Option<String>,
    version: Option<String>,
) -> Result<Vec<HeaderJob>> {
    let filter = ScanFilter { firmware, version };
    let (jobs, failures) = discover_headers(scan_dir, &filter)?;

    for (path, error) in &failures {
        eprintln!("Skipped {}: {}", path.display(), error);
    }
    if jobs.is_empty() {
        bail!("No headers found under {}", scan_dir.display());
    }

    Ok(jobs)
}

fn run_generate(
    jobs: &[HeaderJob],
    base: &MappingConfig,
    tables: &MappingTables,
    json: bool,
) -> Result<ExitCode> {
    base.validate().map_err(anyhow::Error::msg)?;

    let report = generate_batch(jobs, base, tables);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for summary in &report.successes {
            println!("{}", summary.header.display());
            println!("  defines found:      {}", summary.defines_found);
            println!("  fields categorized: {}", summary.fields_categorized);
            println!("  categories:         {}", summary.categories);
            println!("  core fields:        {}", summary.core_fields);
            println!("  ui bound:           {}", summary.ui_bound);
            for output in &summary.outputs {
                println!("  -> {}", output.display());
            }
        }
        print_failures(&report);
        println!(
            "Processed {} header(s): {} succeeded, {} failed in {:.2?}",
            report.total(),
            report.successes.len(),
            report.failures.len(),
            report.elapsed
        );
    }

    Ok(exit_code(&report))
}

fn run_annotate(
    header: &Path,
    mapping_dir: &Path,
    pattern: &str,
    bind_ui: bool,
    tables: &MappingTables,
) -> Result<ExitCode> {
    let header = parse_header_file(header, fwmap_header::DEFAULT_MAX_FILE_SIZE)?;
    let documents = find_documents(mapping_dir, pattern)?;

    let annotator = Annotator::new(&header, tables, bind_ui);
    let report = annotate_documents(&annotator, &documents);

    for summary in &report.successes {
        println!(
            "{}: {} field(s) updated",
            summary.document.display(),
            summary.fields_updated
        );
    }
    print_failures(&report);

    Ok(exit_code(&report))
}

fn run_coverage(
    headers: &[PathBuf],
    mapping_dir: &Path,
    pattern: &str,
    output: Option<&Path>,
    tables: &MappingTables,
) -> Result<ExitCode> {
    let documents = find_documents(mapping_dir, pattern)?;
    let report = coverage_report(headers, &documents, fwmap_header::DEFAULT_MAX_FILE_SIZE, tables)?;

    print!("{}", report.render_text());

    if let Some(path) = output {
        write_report(&report, path)?;
        println!("\nReport written to {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn print_failures<T>(report: &BatchReport<T>) {
    for (path, error) in &report.failures {
        eprintln!("FAILED {}: {}", path.display(), error);
    }
}

fn exit_code<T>(report: &BatchReport<T>) -> ExitCode {
    if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_requires_config_or_scan() {
        assert!(Cli::try_parse_from(["fwmap", "generate"]).is_err());
        assert!(Cli::try_parse_from(["fwmap", "generate", "--scan", "--config", "a.h"]).is_err());

        let cli = Cli::try_parse_from(["fwmap", "generate", "--scan", "--firmware", "th3d"]).unwrap();
        match cli.command {
            Command::Generate {
                scan,
                scan_dir,
                firmware,
                ..
            } => {
                assert!(scan);
                assert_eq!(scan_dir, PathBuf::from("new configs"));
                assert_eq!(firmware.as_deref(), Some("th3d"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_coverage_takes_several_headers() {
        let cli = Cli::try_parse_from([
            "fwmap",
            "-vv",
            "coverage",
            "--config",
            "Configuration.h",
            "--config",
            "Configuration_adv.h",
            "--mapping-dir",
            "maps",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Coverage { config, pattern, .. } => {
                assert_eq!(config.len(), 2);
                assert_eq!(pattern, "**/*.json");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
