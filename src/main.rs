mod cli;
mod db;
mod error;
mod models;

use colored::*;
use db::{CityRepository, DbConfig};
use error::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout only carries the demonstration output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    cli::parse_args()?;

    // Without a usable driver nothing can run, so this is the one fatal error.
    let config = match DbConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load database configuration: {:?}", e);
            println!("{}", cli::startup_error_message(&e).red());
            std::process::exit(1);
        },
    };

    let repository = CityRepository::new(config);
    cli::print_banner(repository.config());

    let report = cli::run_demo(&repository).await;

    println!("\n---\n");
    if report.failures == 0 {
        println!("{}", "All steps completed successfully.".green());
    } else {
        println!(
            "{}",
            format!(
                "{} step(s) failed. Check logs for details.",
                report.failures
            )
            .yellow()
        );
    }
    info!("Exiting.");

    Ok(())
}
