use crate::demo::{run_demo, run_export, run_stats, DemoArgs, ExportArgs, StatsArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use property_portal::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Property Portal",
    about = "Run the property portal verification service or inspect verification data from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Report on or export applicant verification data
    Verification {
        #[command(subcommand)]
        command: VerificationCommand,
    },
    /// Walk through registration, moderation, reporting, and export with a sample roster
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum VerificationCommand {
    /// Print status counts and verification rates per applicant kind
    Stats(StatsArgs),
    /// Write a CSV or JSON export of filtered applicants
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Verification {
            command: VerificationCommand::Stats(args),
        } => run_stats(args),
        Command::Verification {
            command: VerificationCommand::Export(args),
        } => run_export(args),
        Command::Demo(args) => run_demo(args),
    }
}
