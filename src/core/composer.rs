//! Wires the sources and the pure calculations into one dependency graph.
//!
//! Building a graph only registers continuations; nothing here waits on a
//! task. The single wait happens in [`run_query`] (or its blocking twin) once
//! the final report task exists.

use std::fmt::Debug;
use std::sync::Arc;

use tracing::{debug, info};

use super::engine::{
    calculate_death_age, calculate_lifestyle, calculate_retirement_years,
    calculate_super_balance, calculate_working_years, classify,
};
use super::error::Result;
use super::task::{Pool, Task};
use super::types::{LifestyleReport, PersonRecord, StrategyTriple, Tier};
use crate::sources::Providers;

#[derive(Debug, Clone, Copy)]
struct Figures {
    working_years: i32,
    death_age: i32,
    retirement_years: i32,
    super_balance: f64,
}

/// Every node of one query's dataflow graph. Nodes are exposed so callers can
/// subscribe to intermediate results without forcing them.
#[derive(Debug, Clone)]
pub struct QueryGraph {
    pub person: Task<PersonRecord>,
    pub start_super_age: Task<i32>,
    pub strategy: Task<String>,
    pub contribution: Task<i32>,
    pub retirement_age: Task<i32>,
    pub working_years: Task<i32>,
    pub strategy_triple: Task<StrategyTriple>,
    pub super_balance: Task<f64>,
    pub death_age: Task<i32>,
    pub retirement_years: Task<i32>,
    pub lifestyle_ratio: Task<f64>,
    pub tier: Task<Tier>,
    pub report: Task<LifestyleReport>,
}

impl QueryGraph {
    pub fn build(pool: &Pool, providers: Arc<dyn Providers>, full_name: &str) -> Self {
        let person = {
            let providers = Arc::clone(&providers);
            let name = full_name.to_string();
            pool.schedule("person", move || providers.lookup_person(&name))
        };
        let start_super_age = {
            let providers = Arc::clone(&providers);
            pool.schedule("start_super_age", move || providers.start_super_age())
        };
        let strategy = {
            let providers = Arc::clone(&providers);
            pool.schedule("strategy", move || providers.strategy())
        };
        let contribution = {
            let providers = Arc::clone(&providers);
            pool.schedule("contribution", move || providers.contribution())
        };
        let retirement_age = {
            let providers = Arc::clone(&providers);
            pool.schedule("retirement_age", move || providers.retirement_age())
        };

        observe(&start_super_age);
        observe(&strategy);
        observe(&contribution);
        observe(&retirement_age);
        observe(&person);

        let working_years =
            start_super_age.combine("working_years", &retirement_age, |start, retire| {
                Ok(calculate_working_years(start, retire))
            });

        // Only two tasks join at a time, so the triple is the working years
        // continued into a join of the two strategy settings.
        let strategy_triple = {
            let (strategy, contribution) = (strategy.clone(), contribution.clone());
            working_years.chain("strategy_triple", move |working_years| {
                strategy.combine(
                    "strategy_settings",
                    &contribution,
                    move |strategy_name, contribution_percent| {
                        Ok(StrategyTriple {
                            working_years,
                            strategy_name,
                            contribution_percent,
                        })
                    },
                )
            })
        };

        let super_balance = strategy_triple.transform("super_balance", |triple| {
            calculate_super_balance(
                triple.working_years,
                &triple.strategy_name,
                triple.contribution_percent,
            )
        });

        let death_age = person.transform("death_age", |p| {
            Ok(calculate_death_age(p.birth_year, p.gender))
        });

        let retirement_years =
            death_age.combine("retirement_years", &retirement_age, |death, retire| {
                Ok(calculate_retirement_years(death, retire))
            });

        let lifestyle_ratio =
            retirement_years.combine("lifestyle_ratio", &super_balance, calculate_lifestyle);

        let tier = lifestyle_ratio.transform("tier", |ratio| Ok(classify(ratio)));

        let report = assemble_report(
            full_name,
            &working_years,
            &death_age,
            &retirement_years,
            &super_balance,
            &lifestyle_ratio,
            &tier,
        );

        QueryGraph {
            person,
            start_super_age,
            strategy,
            contribution,
            retirement_age,
            working_years,
            strategy_triple,
            super_balance,
            death_age,
            retirement_years,
            lifestyle_ratio,
            tier,
            report,
        }
    }
}

fn observe<T>(task: &Task<T>)
where
    T: Debug + Clone + Send + Sync + 'static,
{
    let label = task.label();
    task.on_complete(move |outcome| {
        if let Ok(value) = outcome {
            debug!(source = label, ?value, "source resolved");
        }
    });
}

fn assemble_report(
    full_name: &str,
    working_years: &Task<i32>,
    death_age: &Task<i32>,
    retirement_years: &Task<i32>,
    super_balance: &Task<f64>,
    lifestyle_ratio: &Task<f64>,
    tier: &Task<Tier>,
) -> Task<LifestyleReport> {
    let spans = working_years.combine("spans", retirement_years, |w, r| Ok((w, r)));
    let outlook = death_age.combine("outlook", super_balance, |d, b| Ok((d, b)));
    let figures = spans.combine(
        "figures",
        &outlook,
        |(working_years, retirement_years), (death_age, super_balance)| {
            Ok(Figures {
                working_years,
                death_age,
                retirement_years,
                super_balance,
            })
        },
    );
    let scored = lifestyle_ratio.combine("scored", tier, |ratio, tier| Ok((ratio, tier)));

    let full_name = full_name.to_string();
    figures.combine("report", &scored, move |figures, (lifestyle_ratio, tier)| {
        Ok(LifestyleReport {
            full_name,
            working_years: figures.working_years,
            death_age: figures.death_age,
            retirement_years: figures.retirement_years,
            super_balance: figures.super_balance,
            lifestyle_ratio,
            tier,
        })
    })
}

/// Computes the lifestyle report for `full_name`, waiting once for the final
/// node of the graph.
pub async fn run_query(
    pool: &Pool,
    providers: Arc<dyn Providers>,
    full_name: &str,
) -> Result<LifestyleReport> {
    info!(name = full_name, "lifestyle query started");
    let graph = QueryGraph::build(pool, providers, full_name);
    let report = graph.report.join().await?;
    info!(
        name = full_name,
        tier = %report.tier,
        ratio = report.lifestyle_ratio,
        "lifestyle query finished"
    );
    Ok(report)
}

/// Blocking form of [`run_query`] for callers that are not runtime workers.
pub fn run_query_blocking(
    pool: &Pool,
    providers: Arc<dyn Providers>,
    full_name: &str,
) -> Result<LifestyleReport> {
    QueryGraph::build(pool, providers, full_name).report.force()
}
