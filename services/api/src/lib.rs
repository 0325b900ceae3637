mod cli;
mod infra;
mod routes;
mod server;
mod validate;

use court_publications::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
