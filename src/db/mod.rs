//! Provides database interaction functionalities.
//!
//! - `config`: connection settings and backend selection.
//! - `dao`: the `CityDao` contract.
//! - `repository`: the `sqlx`-backed `CityRepository`.

mod config;
mod dao;
mod repository;

pub use config::*;
pub use dao::*;
pub use repository::*;
