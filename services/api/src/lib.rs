mod cli;
mod infra;
mod report;
mod routes;
mod server;

use ceija5_registros::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
