use crate::evaluate::{run_evaluate, EvaluateArgs};
use crate::worker;
use clap::{Parser, Subcommand};
use proposal_flow::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "proposal-flow-risk",
    about = "Evaluate credit proposals announced on the proposals queue",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Consume ProposalCreated events until interrupted (default command)
    Serve,
    /// Run the risk rules against one applicant without touching any queue
    Evaluate(EvaluateArgs),
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => worker::run().await,
        Command::Evaluate(args) => run_evaluate(args).await,
    }
}
