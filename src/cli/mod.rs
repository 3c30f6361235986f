//! Handles Command Line Interface (CLI) related functionalities.
//!
//! The binary takes no options of its own; clap only provides `--help` and
//! `--version`. This module also renders configuration and cities for the
//! terminal, and hosts the fixed demonstration sequence.

mod demo;

pub use demo::*;
use crate::db::{DbConfig, DB_DRIVER, DB_PASSWORD, DB_URL, DB_USER};
use crate::error::{AppError, Result};
use crate::models::City;
use clap::Parser;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Table};

/// Runs a fixed CRUD demonstration against the `city` table.
///
/// Connection settings come from DB_URL, DB_USER, DB_PASSWORD and DB_DRIVER
/// (a `.env` file in the working directory is honoured).
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {}

/// Parses the command line. `--help` and `--version` print and exit here.
pub fn parse_args() -> Result<Cli> {
    match Cli::try_parse() {
        Ok(cli) => Ok(cli),
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => Err(e.into()),
    }
}

/// Prints the effective connection settings, never the password itself.
pub fn print_banner(config: &DbConfig) {
    let unset = || "<unset>".dimmed().to_string();
    println!("{}", "City DAO demonstration".cyan().bold());
    println!(
        "{}: {}",
        DB_URL,
        config.url.clone().unwrap_or_else(unset)
    );
    println!(
        "{}: {}",
        DB_USER,
        config.user.clone().unwrap_or_else(unset)
    );
    println!("{}: {}", DB_PASSWORD, config.masked_password());
    println!("{}: {}", DB_DRIVER, config.driver);
    println!("\n---\n");
}

/// The single line shown when the program cannot start.
pub fn startup_error_message(err: &AppError) -> String {
    format!("Error: Invalid database configuration. {}", err)
}

/// Renders cities as a table, one row per city.
pub fn city_table(cities: &[City]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["ID", "Name", "Country", "District", "Population"]);
    for city in cities {
        table.add_row(vec![
            city.id.to_string(),
            city.name.clone(),
            city.country_code.clone(),
            city.district.clone(),
            city.population.to_string(),
        ]);
    }
    table
}
