mod composer;
mod engine;
mod error;
mod task;
mod types;

pub use composer::{QueryGraph, run_query, run_query_blocking};
pub use engine::{
    COMFORTABLE_THRESHOLD, MODEST_THRESHOLD, REFERENCE_YEAR, calculate_death_age,
    calculate_lifestyle, calculate_retirement_years, calculate_super_balance,
    calculate_working_years, classify, performance,
};
pub use error::{LifestyleError, Result};
pub use task::{Pool, Settle, Task, await_all};
pub use types::{Gender, LifestyleReport, PersonRecord, StrategyTriple, SuperStrategy, Tier};
