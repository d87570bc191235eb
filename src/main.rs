//! quality-guard CLI entry point.

use clap::Parser;
use quality_guard::cli::{self, Cli, Commands, EXIT_ERROR};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Check(args) => cli::run_check(&args),
        Commands::Generate(args) => cli::run_generate(&args),
        Commands::Init(args) => cli::run_init(&args),
        Commands::Rules => cli::run_rules(),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
