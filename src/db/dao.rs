//! The data-access contract for the `city` table.

use crate::error::Result;
use crate::models::City;

/// CRUD operations over the `city` table.
///
/// Each call is a single round trip. "Not found" is never an error: lookups
/// return `Ok(None)` or an empty `Vec`, and writes that touch no row return
/// `Ok(0)`. `Err` is reserved for connection and query failures.
#[async_trait::async_trait]
pub trait CityDao {
    /// Finds a city by its primary key.
    async fn find_by_id(&self, id: i32) -> Result<Option<City>>;

    /// Finds every city whose name contains `name_part`, ignoring case.
    ///
    /// `name_part` is used as a SQL `LIKE` pattern: `%` and `_` keep their
    /// wildcard meaning, so `"%"` matches every city.
    async fn find_by_name(&self, name_part: &str) -> Result<Vec<City>>;

    /// Finds every city whose country code equals `code` exactly.
    async fn find_by_code(&self, code: &str) -> Result<Vec<City>>;

    async fn find_all(&self) -> Result<Vec<City>>;

    /// Inserts `city` (its id is ignored) and returns a copy carrying the generated id.
    async fn save(&self, city: &City) -> Result<City>;

    /// Rewrites every non-id column of the row matching `city.id`.
    /// Returns the number of rows affected.
    async fn update(&self, city: &City) -> Result<u64>;

    /// Deletes the row with the given id. Returns the number of rows affected.
    async fn delete_by_id(&self, id: i32) -> Result<u64>;
}
