//! Command-line interface for quality-guard.

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::detect::{collect_files, CollectOptions, RuleName, RuleSet, Severity, Validator};
use crate::generate::{Generator, StubOutcome};
use crate::report::{self, HumanOptions};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Source quality gate for Python projects.
///
/// quality-guard parses Python files and reports functions without tests or
/// docstrings, functions that are too long, take too many parameters, nest
/// too deeply or branch too much, and uses of forbidden constructs.
#[derive(Parser)]
#[command(name = "quality-guard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check Python files against the quality rules
    #[command(visible_alias = "lint")]
    Check(CheckArgs),
    /// Write test stubs and print docstring templates for flagged functions
    Generate(GenerateArgs),
    /// Write a default configuration file
    Init(InitArgs),
    /// List the available rules
    Rules,
}

/// Output format for `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Sarif,
}

/// Arguments for the check command.
#[derive(Parser)]
pub struct CheckArgs {
    /// Files or directories to check
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Path to configuration file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Project root for config discovery and test/doc lookups (default: current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Number of worker threads (default: one per CPU)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Lowest severity that fails the run: info, warning, error, critical
    #[arg(long)]
    pub enforcement_level: Option<Severity>,

    /// Print the suggestion under each violation
    #[arg(long)]
    pub show_suggestions: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Arguments for the generate command.
#[derive(Parser)]
pub struct GenerateArgs {
    /// Files or directories to scaffold
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Path to configuration file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Project root for config discovery and test lookups (default: current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Directory for test stubs, relative to the root (default: from config)
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Only write test stubs
    #[arg(long, conflicts_with = "docs_only")]
    pub tests_only: bool,

    /// Only print docstring templates
    #[arg(long)]
    pub docs_only: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Project root, config and target files shared by `check` and `generate`.
struct Workspace {
    root: PathBuf,
    config: Config,
    files: Vec<PathBuf>,
}

/// Resolve the workspace, or `None` after reporting a bad root or path.
fn open_workspace(
    root: Option<&Path>,
    config: Option<&Path>,
    paths: &[PathBuf],
) -> anyhow::Result<Option<Workspace>> {
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir()?,
    };
    if !root.is_dir() {
        eprintln!("Error: project root is not a directory: {}", root.display());
        return Ok(None);
    }

    let (config, config_path) = Config::resolve(config, &root)?;
    if let Some(path) = &config_path {
        log::info!("loaded configuration from {}", path.display());
    }

    for path in paths {
        if !path.exists() {
            eprintln!("Error: path not found: {}", path.display());
            return Ok(None);
        }
    }

    let options = CollectOptions {
        include_test_files: config.include_test_files,
        exclude: config.exclude_set()?,
    };
    let mut files: Vec<PathBuf> = paths
        .iter()
        .flat_map(|p| collect_files(p, &options))
        .collect();
    files.sort();
    files.dedup();

    if files.is_empty() {
        eprintln!("Warning: no files to scan");
    }
    Ok(Some(Workspace {
        root,
        config,
        files,
    }))
}

/// Run the check command.
pub fn run_check(args: &CheckArgs) -> anyhow::Result<i32> {
    let workspace = open_workspace(args.root.as_deref(), args.config.as_deref(), &args.paths)?;
    let Some(Workspace {
        root,
        mut config,
        files,
    }) = workspace
    else {
        return Ok(EXIT_ERROR);
    };
    if let Some(level) = args.enforcement_level {
        config.enforcement_level = level;
    }
    log::debug!("checking {} files", files.len());

    let level = config.enforcement_level;
    let mut validator = Validator::new(config, &root);
    if let Some(jobs) = args.jobs {
        validator = validator.with_jobs(jobs);
    }
    let reports = validator.validate_paths(&files);
    let blocking = reports.iter().any(|r| r.has_blocking(level));
    let violations: Vec<_> = reports.into_iter().flat_map(|r| r.violations).collect();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Json => report::write_json(&mut out, &violations)?,
        OutputFormat::Sarif => report::write_sarif(&mut out, &root, &violations)?,
        OutputFormat::Human => {
            let options = HumanOptions {
                color: !args.no_color && io::stdout().is_terminal(),
                show_suggestions: args.show_suggestions,
            };
            report::write_human(&mut out, &violations, options)?;
        }
    }
    out.flush()?;

    if blocking {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the generate command.
pub fn run_generate(args: &GenerateArgs) -> anyhow::Result<i32> {
    let workspace = open_workspace(args.root.as_deref(), args.config.as_deref(), &args.paths)?;
    let Some(Workspace {
        root,
        mut config,
        files,
    }) = workspace
    else {
        return Ok(EXIT_ERROR);
    };
    if let Some(dir) = &args.output_dir {
        config.test_output_dir = dir.clone();
    }
    if args.tests_only {
        config.generate_docs = false;
    }
    if args.docs_only {
        config.generate_tests = false;
    }
    if !config.generate_tests && !config.generate_docs {
        eprintln!("Warning: test and docstring generation are both disabled");
        return Ok(EXIT_SUCCESS);
    }

    let report = Generator::new(&config, &root).run(&files)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for test in &report.tests {
        let action = match test.outcome {
            StubOutcome::Created => "Created",
            StubOutcome::Appended => "Appended to",
            StubOutcome::Exists => continue,
        };
        writeln!(
            out,
            "{} {}: test_{}",
            action,
            relative(&test.test_file, &root).display(),
            test.function.rsplit('.').next().unwrap_or(&test.function)
        )?;
    }
    for doc in &report.docstrings {
        writeln!(
            out,
            "{}:{}: suggested docstring for '{}':",
            relative(&doc.source, &root).display(),
            doc.line,
            doc.function
        )?;
        for line in doc.template.lines() {
            writeln!(out, "    {}", line)?;
        }
    }
    writeln!(
        out,
        "Generated {} test stubs and {} docstring templates",
        report.written(),
        report.docstrings.len()
    )?;

    Ok(EXIT_SUCCESS)
}

fn relative<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Use --force to overwrite it or --output to choose another path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            std::fs::create_dir_all(parent)?;
        }
    }

    let content = serde_json::to_string_pretty(&Config::template())?;
    std::fs::write(&args.output, format!("{}\n", content))?;

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to customize for your project", args.output.display());
    println!("  2. Run: quality-guard check . --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

/// List every rule with its default severity.
pub fn run_rules() -> anyhow::Result<i32> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "Rules (in evaluation order):")?;
    writeln!(out)?;
    let rules = RuleSet::standard().names();
    for rule in &rules {
        write_rule(&mut out, *rule)?;
    }

    writeln!(out)?;
    writeln!(out, "Always reported:")?;
    writeln!(out)?;
    for rule in RuleName::ALL.iter().filter(|r| r.is_synthetic()) {
        write_rule(&mut out, *rule)?;
    }

    Ok(EXIT_SUCCESS)
}

fn write_rule<W: Write>(out: &mut W, rule: RuleName) -> io::Result<()> {
    writeln!(
        out,
        "  {:<24} {:<8} {}",
        rule.as_str(),
        rule.default_severity(),
        rule.description()
    )
}
