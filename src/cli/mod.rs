use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::console::run_console;
use crate::errors::CovError;
use crate::logging::{ConsoleSink, LogSink, Logger};
use crate::pipeline::BatchRunner;

pub mod doctor;

#[derive(Parser)]
#[command(version, about = "Turns a test-coverage spreadsheet into a heatmap, a compiled report and a mail notification", long_about = None)]
struct Cli {
    #[arg(
        long,
        short,
        default_value = "config.yaml",
        help = "Path to the settings document"
    )]
    config: PathBuf,

    #[arg(long, short, default_value_t = false, help = "Print debug log lines")]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the full pipeline unattended")]
    Run,
    #[command(about = "Open the interactive command center")]
    Console,
    #[command(about = "Check that the external tools are available")]
    Doctor,
}

/// Parse the command line and run the selected front end.
pub fn parse_cli() -> Result<(), CovError> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let logger = Logger::new(Arc::new(ConsoleSink::new(cli.verbose)) as Arc<dyn LogSink>);
            BatchRunner::new(cli.config, logger).run()
        }
        Commands::Console => run_console(&cli.config),
        Commands::Doctor => {
            doctor::check_dependencies(&cli.config);
            Ok(())
        }
    }
}
