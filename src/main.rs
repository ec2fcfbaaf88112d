//! The main entry point for the program.
use anyhow::Result;
use clap::Parser;
use heathub::commands::{Cli, Commands, handle_run_command, handle_validate_command};

fn main() -> Result<()> {
    human_panic::setup_panic!();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            model_dir,
            output_dir,
            scenarios,
        } => handle_run_command(&model_dir, output_dir.as_deref(), scenarios.as_deref()),
        Commands::Validate { model_dir } => handle_validate_command(&model_dir),
    }
}
