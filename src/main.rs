//! tu-tracker CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tu_tracker::cli::{Cli, Commands};
use tu_tracker::commands::{run_affected, run_analyze, run_deps, CommandContext};
use tu_tracker::config::TrackerConfig;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn run(cli: &Cli) -> tu_tracker::Result<String> {
    let ctx = CommandContext::from_cli(cli.format, cli.verbose);

    match &cli.command {
        Commands::Analyze(args) => run_analyze(args, &ctx),
        Commands::Deps(args) => run_deps(args, &ctx),
        Commands::Affected(args) => run_affected(args, &ctx),
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` means debug and the project file's
/// `[logging] level` applies.
fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        TrackerConfig::load_from(cli.command.project())
            .map(|config| config.logging.level)
            .unwrap_or_else(|_| "info".to_string())
    };

    let mut filter = EnvFilter::from_default_env();
    match format!("tu_tracker={}", level).parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Ignoring log level {:?}: {}", level, e),
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
