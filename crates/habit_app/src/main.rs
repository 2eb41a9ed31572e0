use std::process::ExitCode;

use clap::Parser;
use habit_app::{
    app::{run, AppConfig},
    cli::Args,
    init_logging,
};

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();
    let mut config = AppConfig::from_env().unwrap_or_default();
    config.apply_args(&args);
    if let Err(err) = run(config, args.command) {
        tracing::error!(error = ?err, "command failed");
        eprintln!("habits: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
