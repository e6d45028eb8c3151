mod cli;
mod evaluate;
mod worker;

use proposal_flow::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
