//! The `City` entity, mirroring one row of the `city` table.

use std::fmt;

/// One row of the `city` table.
///
/// `id` is zero until [`CityDao::save`](crate::db::CityDao::save) hands back a copy
/// carrying the store-generated key. Queries alias the table's columns to the
/// lowercase field names so `sqlx::FromRow` maps rows from any backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, sqlx::FromRow)]
pub struct City {
    /// Primary key (0 before insertion).
    pub id: i32,
    pub name: String,
    /// Three-letter country code, e.g. `SWE`.
    pub country_code: String,
    pub district: String,
    pub population: i32,
}

impl City {
    /// Creates a city that has not been saved yet.
    pub fn new(
        name: impl Into<String>,
        country_code: impl Into<String>,
        district: impl Into<String>,
        population: i32,
    ) -> Self {
        Self::with_id(0, name, country_code, district, population)
    }

    pub fn with_id(
        id: i32,
        name: impl Into<String>,
        country_code: impl Into<String>,
        district: impl Into<String>,
        population: i32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            country_code: country_code.into(),
            district: district.into(),
            population,
        }
    }

    /// Returns a copy of this city carrying `id`, leaving the other fields untouched.
    pub fn with_generated_id(&self, id: i32) -> Self {
        Self {
            id,
            ..self.clone()
        }
    }

    /// Whether this city has been assigned a key by the store.
    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "City{{id={}, name='{}', countryCode='{}', district='{}', population={}}}",
            self.id, self.name, self.country_code, self.district, self.population
        )
    }
}
