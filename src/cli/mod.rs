//! CLI module for codemap

mod args;

pub use args::{Args, Command};

use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::error::{Error, Result};
use crate::generate::{Generator, GeneratorConfig};
use crate::map::ChangeReport;
use crate::validate::{ValidateOptions, ValidationReport, Validator};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Cap on listed items per report section
const MAX_ITEMS: usize = 10;

/// Run the CLI application
pub fn run() -> ExitCode {
    let args = Args::parse_args();
    init_tracing(&args);

    match execute(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        Level::WARN
    };

    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(level, env.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// `RUST_LOG` directives when set and valid, otherwise `default`
fn log_filter(default: Level, env: Option<&str>) -> EnvFilter {
    env.filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::default().add_directive(default.into()))
}

fn execute(args: Args) -> Result<ExitCode> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut cfg = Config::load_or_default(&config_path);

    match args.command {
        Command::Generate {
            src_dir,
            map_dir,
            dry_run,
            project_name,
            project_description,
            glob,
            exclude,
            templates,
            json,
        } => {
            cfg.merge_cli(project_name, project_description, glob, exclude, None);
            if templates.is_some() {
                cfg.generate.templates = templates;
            }
            cfg.validate()?;

            if !src_dir.exists() {
                return Err(Error::PathNotFound(src_dir));
            }

            let config =
                GeneratorConfig::from_config(&src_dir, &map_dir, &cfg).with_dry_run(dry_run);
            if !json {
                println!("Generating maps: {} -> {}", src_dir.display(), map_dir.display());
                if dry_run {
                    println!("(dry run)");
                }
                println!();
            }

            let (report, _) = Generator::new(config)?.with_verbose(args.verbose).run()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_change_report(&report, &src_dir, &map_dir);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Validate {
            map_dir,
            tolerance,
            json,
        } => {
            cfg.merge_cli(None, None, None, vec![], tolerance);
            cfg.validate()?;

            if !map_dir.exists() {
                return Err(Error::PathNotFound(map_dir));
            }

            let report = Validator::new(ValidateOptions::from(&cfg)).run(&map_dir)?;
            let ok = report.is_ok();

            if json {
                println!("{}", serde_json::to_string_pretty(&report.into_errors())?);
            } else {
                println!("Validating {}...", map_dir.display());
                println!();
                print_validation_report(&report);
            }

            Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

/// Print at most `MAX_ITEMS` lines, then a count of the rest
fn print_capped<T>(items: &[T], line: impl Fn(&T) -> String) {
    for item in items.iter().take(MAX_ITEMS) {
        println!("  {}", line(item));
    }
    if items.len() > MAX_ITEMS {
        println!("  ... and {} more", items.len() - MAX_ITEMS);
    }
}

fn print_change_report(report: &ChangeReport, src_dir: &Path, map_dir: &Path) {
    println!("Summary:");
    println!("  Created: {} files", report.created_files.len());
    println!("  Updated: {} files", report.updated_files.len());
    if !report.deleted_files.is_empty() {
        println!("  Orphaned: {} files (source deleted)", report.deleted_files.len());
    }
    if !report.new_sections.is_empty() || !report.removed_sections.is_empty() {
        println!(
            "  Sections: {} new, {} removed",
            report.new_sections.len(),
            report.removed_sections.len()
        );
    }
    println!();

    if !report.missing_docstrings.is_empty() {
        println!("Missing docstrings ({} total):", report.missing_docstrings.len());
        println!("  Add docstrings to source, then re-run the generator.");
        println!();
        print_capped(&report.missing_docstrings, |m| {
            format!(
                "{}:{} - {}",
                src_dir.join(&m.source_path).display(),
                m.line,
                m.symbol_name
            )
        });
        println!();
    }

    if !report.missing_descriptions.is_empty() {
        println!("Missing descriptions ({} total):", report.missing_descriptions.len());
        println!("  Edit these files directly.");
        println!();
        print_capped(&report.missing_descriptions, |p| map_dir.join(p).display().to_string());
        println!();
    }

    if !report.deleted_files.is_empty() {
        println!("Orphaned map files (source was deleted):");
        print_capped(&report.deleted_files, |p| p.display().to_string());
        println!();
    }

    println!("Next steps:");
    let mut steps = Vec::new();
    if !report.missing_docstrings.is_empty() {
        steps.push("Add docstrings to the source files listed above".to_string());
        steps.push("Re-run the generator to update the map".to_string());
    }
    steps.push("Create domain files in domains/ by grouping related modules".to_string());
    if report
        .missing_descriptions
        .iter()
        .any(|p| p == Path::new("README.md") || p == Path::new("ARCHITECTURE.md"))
    {
        steps.push("Write ARCHITECTURE.md from the domains".to_string());
    }
    if report.missing_docstrings.is_empty() && report.missing_descriptions.is_empty() {
        steps.push(format!("Run validation: codemap validate {}", map_dir.display()));
    }
    for (i, step) in steps.iter().enumerate() {
        println!("  {}. {}", i + 1, step);
    }
}

fn print_validation_report(report: &ValidationReport) {
    for result in &report.checks {
        if result.passed() {
            println!("{}: PASS ({} checked)", result.check.label(), result.checked);
        } else {
            println!(
                "{}: FAIL ({} of {} checked)",
                result.check.label(),
                result.errors.len(),
                result.checked
            );
            for err in &result.errors {
                println!("  {}", err);
            }
        }
    }
    println!();

    match report.error_count() {
        0 => println!("All checks passed."),
        n => println!("{} errors found.", n),
    }
}
