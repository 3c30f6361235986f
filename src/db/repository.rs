//! `CityDao` implementation over a single `sqlx` connection per call.
//!
//! The backend (MySQL, PostgreSQL or SQLite) is picked at runtime from the
//! configured `Driver`; statements are rendered once with that backend's
//! placeholder style. Every operation opens its own connection and closes it
//! before returning, whatever the outcome.

use crate::db::config::{DbConfig, Driver};
use crate::db::dao::CityDao;
use crate::error::{AppError, Result};
use crate::models::City;
use sqlx::any::AnyConnection;
use sqlx::{Connection, Row};
use tracing::{debug, error, info, warn};

const CITY_COLUMNS: &str =
    "ID AS id, Name AS name, CountryCode AS country_code, District AS district, Population AS population";

/// SQL text for each operation, rendered for one driver.
#[derive(Debug, Clone)]
struct Statements {
    find_by_id: String,
    find_by_name: String,
    find_by_code: String,
    find_all: String,
    insert: String,
    update: String,
    delete_by_id: String,
}

impl Statements {
    fn for_driver(driver: Driver) -> Self {
        let p = |n| driver.placeholder(n);
        let select = format!("SELECT {} FROM city", CITY_COLUMNS);

        let mut insert = format!(
            "INSERT INTO city (Name, CountryCode, District, Population) VALUES ({}, {}, {}, {})",
            p(1),
            p(2),
            p(3),
            p(4)
        );
        if driver.returns_generated_key() {
            // Widened so INTEGER and BIGINT keys decode the same way.
            insert.push_str(" RETURNING CAST(ID AS BIGINT) AS id");
        }

        Self {
            find_by_id: format!("{} WHERE ID = {}", select, p(1)),
            find_by_name: if driver.folds_unicode_case() {
                format!("{} WHERE LOWER(Name) LIKE LOWER({})", select, p(1))
            } else {
                // Matched row by row in `like_matches` instead.
                select.clone()
            },
            find_by_code: format!("{} WHERE CountryCode = {}", select, p(1)),
            find_all: select,
            insert,
            update: format!(
                "UPDATE city SET Name = {}, CountryCode = {}, District = {}, Population = {} WHERE ID = {}",
                p(1),
                p(2),
                p(3),
                p(4),
                p(5)
            ),
            delete_by_id: format!("DELETE FROM city WHERE ID = {}", p(1)),
        }
    }
}

/// Data access for the `city` table.
///
/// Holds no connection between calls, only the configuration needed to open one.
pub struct CityRepository {
    config: DbConfig,
    sql: Statements,
}

impl CityRepository {
    pub fn new(config: DbConfig) -> Self {
        info!("Using {} driver for the city repository", config.driver);
        let sql = Statements::for_driver(config.driver);
        Self { config, sql }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Opens a fresh connection for a single operation.
    ///
    /// # Errors
    ///
    /// `AppError::Config` if no URL is configured, `AppError::Db` if the URL is
    /// malformed or the store cannot be reached.
    async fn connect(&self) -> Result<AnyConnection> {
        let options = self.config.connect_options().map_err(|e| {
            error!("Invalid connection settings: {}", e);
            e
        })?;
        AnyConnection::connect_with(&options).await.map_err(|e| {
            error!("Failed to connect to database: {}", e);
            AppError::from(e)
        })
    }

    /// Runs the insert and extracts the generated key.
    async fn insert(&self, conn: &mut AnyConnection, city: &City) -> Result<i32> {
        let query = sqlx::query(&self.sql.insert)
            .bind(city.name.as_str())
            .bind(city.country_code.as_str())
            .bind(city.district.as_str())
            .bind(city.population);

        let generated = if self.config.driver.returns_generated_key() {
            match query.fetch_optional(&mut *conn).await? {
                Some(row) => row.try_get::<i64, _>(0)?,
                None => return Err(AppError::InsertFailed),
            }
        } else {
            let done = query.execute(&mut *conn).await?;
            if done.rows_affected() == 0 {
                return Err(AppError::InsertFailed);
            }
            done.last_insert_id().ok_or(AppError::MissingGeneratedKey)?
        };

        match i32::try_from(generated) {
            Ok(id) if id != 0 => Ok(id),
            _ => Err(AppError::MissingGeneratedKey),
        }
    }
}

/// Case-insensitive SQL `LIKE` match with full Unicode lowercasing.
/// `%` matches any run of characters, `_` exactly one.
fn like_matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `%` seen and the text index it was tried against.
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, from)) = backtrack {
            p = star + 1;
            t = from + 1;
            backtrack = Some((star, from + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '%')
}

/// Closes a connection. A failed close does not change the outcome of the
/// operation that used it.
async fn release(conn: AnyConnection) {
    if let Err(e) = conn.close().await {
        debug!("Error while closing database connection: {}", e);
    }
}

#[async_trait::async_trait]
impl CityDao for CityRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<City>> {
        debug!("Finding city by id {}", id);
        let mut conn = self.connect().await?;
        let result = sqlx::query_as::<_, City>(&self.sql.find_by_id)
            .bind(id)
            .fetch_optional(&mut conn)
            .await;
        release(conn).await;

        result.map_err(|e| {
            error!("Failed to find city with id {}: {}", id, e);
            AppError::from(e)
        })
    }

    async fn find_by_name(&self, name_part: &str) -> Result<Vec<City>> {
        debug!("Finding cities with name containing {:?}", name_part);
        let pattern = format!("%{}%", name_part);
        let mut conn = self.connect().await?;
        let mut query = sqlx::query_as::<_, City>(&self.sql.find_by_name);
        if self.config.driver.folds_unicode_case() {
            query = query.bind(pattern.as_str());
        }
        let result = query.fetch_all(&mut conn).await;
        release(conn).await;

        let cities = result.map_err(|e| {
            error!("Failed to find cities by name {:?}: {}", name_part, e);
            AppError::from(e)
        })?;
        if self.config.driver.folds_unicode_case() {
            return Ok(cities);
        }
        Ok(cities
            .into_iter()
            .filter(|city| like_matches(&pattern, &city.name))
            .collect())
    }

    async fn find_by_code(&self, code: &str) -> Result<Vec<City>> {
        debug!("Finding cities with country code {:?}", code);
        let mut conn = self.connect().await?;
        let result = sqlx::query_as::<_, City>(&self.sql.find_by_code)
            .bind(code)
            .fetch_all(&mut conn)
            .await;
        release(conn).await;

        result.map_err(|e| {
            error!("Failed to find cities by country code {:?}: {}", code, e);
            AppError::from(e)
        })
    }

    async fn find_all(&self) -> Result<Vec<City>> {
        debug!("Fetching all cities");
        let mut conn = self.connect().await?;
        let result = sqlx::query_as::<_, City>(&self.sql.find_all)
            .fetch_all(&mut conn)
            .await;
        release(conn).await;

        result.map_err(|e| {
            error!("Failed to fetch all cities: {}", e);
            AppError::from(e)
        })
    }

    async fn save(&self, city: &City) -> Result<City> {
        debug!("Saving city {}", city);
        let mut conn = self.connect().await?;
        let result = self.insert(&mut conn, city).await;
        release(conn).await;

        match result {
            Ok(id) => {
                info!("Saved city {:?} with id {}", city.name, id);
                Ok(city.with_generated_id(id))
            },
            Err(e) => {
                error!("Failed to save city {:?}: {}", city.name, e);
                Err(e)
            },
        }
    }

    async fn update(&self, city: &City) -> Result<u64> {
        debug!("Updating city {}", city);
        let mut conn = self.connect().await?;
        let result = sqlx::query(&self.sql.update)
            .bind(city.name.as_str())
            .bind(city.country_code.as_str())
            .bind(city.district.as_str())
            .bind(city.population)
            .bind(city.id)
            .execute(&mut conn)
            .await;
        release(conn).await;

        let affected = result
            .map_err(|e| {
                error!("Failed to update city with id {}: {}", city.id, e);
                AppError::from(e)
            })?
            .rows_affected();
        if affected == 0 {
            warn!("Update failed, no rows affected. ID: {}", city.id);
        }
        Ok(affected)
    }

    async fn delete_by_id(&self, id: i32) -> Result<u64> {
        debug!("Deleting city with id {}", id);
        let mut conn = self.connect().await?;
        let result = sqlx::query(&self.sql.delete_by_id)
            .bind(id)
            .execute(&mut conn)
            .await;
        release(conn).await;

        let affected = result
            .map_err(|e| {
                error!("Failed to delete city with id {}: {}", id, e);
                AppError::from(e)
            })?
            .rows_affected();
        if affected == 0 {
            warn!("Delete failed, no rows affected. ID: {}", id);
        }
        Ok(affected)
    }
}


// --- Integration Tests ---
// These run against a real server configured through the DB_* variables and
// expect the `city` table to exist already.
// Run using: `cargo test --features integration-tests`
#[cfg(test)]
#[cfg(feature = "integration-tests")]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_city_lifecycle_against_configured_store() -> Result<()> {
        let repo = CityRepository::new(DbConfig::from_env()?);
        let initial = repo.find_all().await?.len();

        let saved = repo
            .save(&City::new("Testgränd", "SWE", "Testlän", 12345))
            .await?;
        assert!(saved.is_persisted(), "save should assign a generated id");
        assert_eq!(repo.find_by_id(saved.id).await?, Some(saved.clone()));
        assert!(repo.find_by_name("testgr").await?.contains(&saved));
        assert!(repo.find_by_code("SWE").await?.contains(&saved));

        let mut updated = saved.clone();
        updated.population = 54321;
        assert_eq!(repo.update(&updated).await?, 1);
        assert_eq!(repo.find_by_id(saved.id).await?, Some(updated));

        assert_eq!(repo.delete_by_id(saved.id).await?, 1);
        assert_eq!(repo.find_by_id(saved.id).await?, None);
        assert_eq!(repo.find_all().await?.len(), initial);
        Ok(())
    }
}
