//! Defines the data structures and models used throughout the application.
//!
//! Currently this is the single `City` entity backing the `city` table.

mod city;

pub use city::*;
