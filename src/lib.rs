#![doc(test(attr(deny(warnings))))]

//! Budget Tracker provides the records, aggregation, recurrence projection and
//! backend access behind a personal budgeting app: incomes, expenses, bills,
//! savings goals and budget categories scoped to a logged-in user.

pub mod analytics;
pub mod config;
pub mod currency;
pub mod domain;
pub mod errors;
pub mod recurrence;
pub mod repository;
pub mod services;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Budget Tracker tracing initialized.");
    });
}
