use crate::infra::StoreArgs;
use crate::report::{run_expiration_report, run_reminders, ExpirationReportArgs, ReminderArgs};
use crate::server;
use ceija5_registros::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "CEIJA5 Registros",
    about = "Serve and administer CEIJA5 pending pre-enrollment registrations",
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
    /// Inspect and maintain pending registrations from the command line
    Registros {
        #[command(subcommand)]
        command: RegistrosCommand,
    },
}

#[derive(Subcommand, Debug)]
enum RegistrosCommand {
    /// Print every registration with its alarm status and missing documents
    Vencimientos(ExpirationReportArgs),
    /// E-mail students whose registration is close to or past its deadline
    Recordatorios(ReminderArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) store: StoreArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Registros {
            command: RegistrosCommand::Vencimientos(args),
        } => run_expiration_report(args),
        Command::Registros {
            command: RegistrosCommand::Recordatorios(args),
        } => run_reminders(args).await,
    }
}
