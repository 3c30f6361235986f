use crate::cli::city_table;
use crate::db::CityDao;
use crate::error::Result;
use crate::models::City;
use colored::*;
use tracing::{error, info};

pub const SEARCH_NAME: &str = "Test";
pub const SEARCH_CODE: &str = "SWE";
pub const UPDATED_POPULATION: i32 = 54321;

/// The city inserted, updated and finally removed by the demonstration.
pub fn sample_city() -> City {
    City::new("Testgränd", "SWE", "Testlän", 12345)
}

/// What the demonstration observed. `None` marks a step that failed or was
/// skipped.
#[allow(dead_code)] // Only `failures` is read outside tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemoReport {
    pub count_before: Option<usize>,
    pub saved: Option<City>,
    pub name_matches: Option<usize>,
    pub code_matches: Option<usize>,
    pub reread_population: Option<i32>,
    pub deleted: bool,
    pub count_after: Option<usize>,
    /// Number of steps that returned an error.
    pub failures: usize,
}

impl DemoReport {
    /// Logs and prints a failed step, turning it into `None`.
    fn absorb<T>(&mut self, step: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                error!("{} failed: {:?}", step, e);
                println!("{} {}", format!("{} failed:", step).red(), e.to_string().red());
                self.failures += 1;
                None
            },
        }
    }
}

/// Runs the fixed sequence: count, save, read back, search, update, delete, count.
///
/// No single failure stops the sequence; steps that need the saved city are
/// skipped when the save did not succeed.
pub async fn run_demo<D: CityDao + ?Sized>(dao: &D) -> DemoReport {
    let mut report = DemoReport::default();

    report.count_before = report
        .absorb("Find all", dao.find_all().await)
        .map(|cities| cities.len());
    if let Some(count) = report.count_before {
        println!("Cities before insert: {}", count);
    }

    let sample = sample_city();
    report.saved = report
        .absorb("Save", dao.save(&sample).await)
        .filter(City::is_persisted);
    match &report.saved {
        Some(saved) => println!("{} {}", "Saved City:".green(), saved),
        None => println!("{}", "City was not saved; skipping read-back, update and delete.".yellow()),
    }

    if let Some(saved) = report.saved.clone() {
        if let Some(found) = report.absorb("Find by id", dao.find_by_id(saved.id).await) {
            print_lookup("Found City by ID:", saved.id, found.as_ref());
        }
    }

    if let Some(cities) = report.absorb("Find by name", dao.find_by_name(SEARCH_NAME).await) {
        println!("Cities found by name {:?}: {}", SEARCH_NAME, cities.len());
        if !cities.is_empty() {
            println!("{}", city_table(&cities));
        }
        report.name_matches = Some(cities.len());
    }

    if let Some(cities) = report.absorb("Find by code", dao.find_by_code(SEARCH_CODE).await) {
        println!("Cities with country code {}: {}", SEARCH_CODE, cities.len());
        report.code_matches = Some(cities.len());
    }

    if let Some(saved) = report.saved.clone() {
        let mut updated = saved.clone();
        updated.population = UPDATED_POPULATION;
        if report.absorb("Update", dao.update(&updated).await).is_some() {
            if let Some(found) = report.absorb("Find by id", dao.find_by_id(saved.id).await) {
                print_lookup("City after update:", saved.id, found.as_ref());
                report.reread_population = found.map(|c| c.population);
            }
        }

        if let Some(affected) = report.absorb("Delete", dao.delete_by_id(saved.id).await) {
            if let Some(found) = report.absorb("Find by id", dao.find_by_id(saved.id).await) {
                print_lookup("City after delete:", saved.id, found.as_ref());
                report.deleted = affected > 0 && found.is_none();
            }
        }
    }

    report.count_after = report
        .absorb("Find all", dao.find_all().await)
        .map(|cities| cities.len());
    if let Some(count) = report.count_after {
        println!("Total cities in database: {}", count);
    }

    info!("Demonstration finished with {} failed step(s)", report.failures);
    report
}

fn print_lookup(label: &str, id: i32, found: Option<&City>) {
    match found {
        Some(city) => println!("{} {}", label, city),
        None => println!("{} {}", label, format!("no city with id {}", id).yellow()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::{Arc, Mutex};

    // --- Mock DAO State ---
    // An in-memory table plus switches to force failures and a log of calls.
    #[derive(Default)]
    struct MockDbState {
        rows: Vec<City>,
        next_id: i32,
        fail_save: bool,
        fail_find_all: bool,
        calls: Vec<&'static str>,
    }

    #[derive(Clone)]
    struct MockDao {
        state: Arc<Mutex<MockDbState>>,
    }

    impl MockDao {
        fn with_rows(rows: Vec<City>) -> Self {
            let next_id = rows.iter().map(|c| c.id).max().unwrap_or(0) + 1;
            Self {
                state: Arc::new(Mutex::new(MockDbState {
                    rows,
                    next_id,
                    ..Default::default()
                })),
            }
        }

        fn record(&self, call: &'static str) -> std::sync::MutexGuard<'_, MockDbState> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call);
            state
        }

        fn calls(&self) -> Vec<&'static str> {
            self.state.lock().unwrap().calls.clone()
        }

        fn connection_refused() -> AppError {
            AppError::Db(Arc::new(sqlx::Error::PoolTimedOut))
        }
    }

    #[async_trait::async_trait]
    impl CityDao for MockDao {
        async fn find_by_id(&self, id: i32) -> Result<Option<City>> {
            let state = self.record("find_by_id");
            Ok(state.rows.iter().find(|c| c.id == id).cloned())
        }

        async fn find_by_name(&self, name_part: &str) -> Result<Vec<City>> {
            let state = self.record("find_by_name");
            let needle = name_part.to_lowercase();
            Ok(state
                .rows
                .iter()
                .filter(|c| c.name.to_lowercase().contains(&needle))
                .cloned()
                .collect())
        }

        async fn find_by_code(&self, code: &str) -> Result<Vec<City>> {
            let state = self.record("find_by_code");
            Ok(state
                .rows
                .iter()
                .filter(|c| c.country_code == code)
                .cloned()
                .collect())
        }

        async fn find_all(&self) -> Result<Vec<City>> {
            let state = self.record("find_all");
            if state.fail_find_all {
                return Err(Self::connection_refused());
            }
            Ok(state.rows.clone())
        }

        async fn save(&self, city: &City) -> Result<City> {
            let mut state = self.record("save");
            if state.fail_save {
                return Err(AppError::InsertFailed);
            }
            let saved = city.with_generated_id(state.next_id);
            state.next_id += 1;
            state.rows.push(saved.clone());
            Ok(saved)
        }

        async fn update(&self, city: &City) -> Result<u64> {
            let mut state = self.record("update");
            match state.rows.iter_mut().find(|c| c.id == city.id) {
                Some(row) => {
                    *row = city.clone();
                    Ok(1)
                },
                None => Ok(0),
            }
        }

        async fn delete_by_id(&self, id: i32) -> Result<u64> {
            let mut state = self.record("delete_by_id");
            let before = state.rows.len();
            state.rows.retain(|c| c.id != id);
            Ok((before - state.rows.len()) as u64)
        }
    }

    fn seeded_dao() -> MockDao {
        MockDao::with_rows(vec![
            City::with_id(3048, "Stockholm", "SWE", "Lisboa", 750_348),
            City::with_id(2807, "Oslo", "NOR", "Oslo", 508_726),
        ])
    }

    #[tokio::test]
    async fn test_demo_runs_full_lifecycle() {
        let dao = seeded_dao();
        let report = run_demo(&dao).await;

        assert_eq!(report.failures, 0);
        assert_eq!(report.count_before, Some(2));
        let saved = report.saved.clone().expect("sample city should be saved");
        assert_eq!(saved, sample_city().with_generated_id(3049));
        assert_eq!(report.name_matches, Some(1));
        assert_eq!(report.code_matches, Some(2));
        assert_eq!(report.reread_population, Some(UPDATED_POPULATION));
        assert!(report.deleted);
        assert_eq!(report.count_after, report.count_before);

        assert_eq!(
            dao.calls(),
            vec![
                "find_all",
                "save",
                "find_by_id",
                "find_by_name",
                "find_by_code",
                "update",
                "find_by_id",
                "delete_by_id",
                "find_by_id",
                "find_all",
            ]
        );
    }

    #[tokio::test]
    async fn test_demo_skips_dependent_steps_when_save_fails() {
        let dao = seeded_dao();
        dao.state.lock().unwrap().fail_save = true;

        let report = run_demo(&dao).await;

        assert_eq!(report.failures, 1);
        assert!(report.saved.is_none());
        assert_eq!(report.reread_population, None);
        assert!(!report.deleted);
        assert_eq!(report.name_matches, Some(0));
        assert_eq!(report.count_after, Some(2));

        let calls = dao.calls();
        assert!(!calls.contains(&"update"));
        assert!(!calls.contains(&"delete_by_id"));
        assert!(!calls.contains(&"find_by_id"));
    }

    #[tokio::test]
    async fn test_demo_continues_after_find_all_failures() {
        let dao = seeded_dao();
        dao.state.lock().unwrap().fail_find_all = true;

        let report = run_demo(&dao).await;

        assert_eq!(report.failures, 2);
        assert_eq!(report.count_before, None);
        assert_eq!(report.count_after, None);
        assert!(report.saved.is_some());
        assert!(report.deleted);
        assert!(dao.state.lock().unwrap().rows.iter().all(|c| c.name != "Testgränd"));
    }
}
