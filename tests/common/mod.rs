#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use budget_tracker::{
    config::ConfigManager, repository::InMemoryBackend, services::BudgetService,
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Creates a config manager rooted in a unique directory for each test.
pub fn config_manager() -> ConfigManager {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    ConfigManager::with_base_dir(base).expect("create config manager for temp dir")
}

/// A service over a fresh in-memory backend with one registered, logged-in user.
pub fn logged_in_service() -> (BudgetService, Arc<InMemoryBackend>) {
    let backend = Arc::new(InMemoryBackend::new());
    let mut service = BudgetService::new(backend.clone(), backend.clone());
    service
        .register("amina", "amina@example.com", "secret1")
        .expect("register test user");
    (service, backend)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}
