use crate::demo::{
    run_alert_cycle, run_demo, run_schedule, AlertRunArgs, DemoArgs, ScheduleArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use floorplan::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Floor Plan Financing Engine",
    about = "Run or demonstrate the dealer floor plan financing service from the command line",
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
    /// Run the accrual and alert cycle once against the demo book
    Alerts {
        #[command(subcommand)]
        command: AlertsCommand,
    },
    /// Print the curtailment and interest schedule for a prospective unit
    Schedule(ScheduleArgs),
    /// Seed an in-memory dealer, run the alert cycle, and print the dashboard
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum AlertsCommand {
    /// Accrue interest, generate alerts, and list the open ones
    Run(AlertRunArgs),
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
        Command::Alerts {
            command: AlertsCommand::Run(args),
        } => run_alert_cycle(args),
        Command::Schedule(args) => run_schedule(args),
        Command::Demo(args) => run_demo(args),
    }
}
