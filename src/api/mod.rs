use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{LifestyleError, LifestyleReport, Pool, run_query};
use crate::sources::{LATENCY_STEP, PersonDirectory, SimulatedProviders, SourceConfig};

const MAX_LATENCY_MS: u64 = 10_000;

#[derive(Debug, Parser)]
#[command(
    name = "lifestyle",
    about = "Estimates a retirement lifestyle from independently sourced superannuation inputs"
)]
pub struct Cli {
    /// Log task scheduling and source values
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one lifestyle query and print the result
    Query(QueryArgs),
    /// List the people the directory knows about
    Names,
    /// Serve the JSON API over HTTP
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[command(flatten)]
        sources: SourceArgs,
    },
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[arg(long, default_value = "Mia Collins")]
    pub name: String,
    #[arg(long, help = "Print the report as JSON")]
    pub json: bool,
    #[command(flatten)]
    pub sources: SourceArgs,
}

#[derive(Debug, Clone, Copy, Args)]
pub struct SourceArgs {
    #[arg(long, help = "Seed for reproducible simulated sources")]
    pub seed: Option<u64>,
    #[arg(
        long,
        default_value_t = 900,
        help = "Upper bound of simulated source latency in milliseconds (multiple of 100)"
    )]
    pub max_latency_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LifestyleParams {
    name: Option<String>,
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct NamesResponse {
    names: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Clone)]
struct AppState {
    pool: Pool,
    directory: Arc<PersonDirectory>,
    sources: SourceConfig,
}

pub fn build_source_config(args: SourceArgs) -> Result<SourceConfig, String> {
    if args.max_latency_ms > MAX_LATENCY_MS {
        return Err(format!("--max-latency-ms must be <= {MAX_LATENCY_MS}"));
    }

    let step_ms = LATENCY_STEP.as_millis() as u64;
    if args.max_latency_ms % step_ms != 0 {
        return Err(format!("--max-latency-ms must be a multiple of {step_ms}"));
    }

    Ok(SourceConfig {
        seed: args.seed,
        max_latency: Duration::from_millis(args.max_latency_ms),
    })
}

pub async fn run(cli: Cli) -> Result<(), String> {
    let directory =
        PersonDirectory::embedded().map_err(|e| format!("Failed to load directory: {e}"))?;

    match cli.command {
        Command::Names => {
            for name in directory.names() {
                println!("{name}");
            }
            Ok(())
        }
        Command::Query(args) => {
            let config = build_source_config(args.sources)?;
            let providers = Arc::new(SimulatedProviders::new(directory, config));
            let report = run_query(&Pool::current(), providers, &args.name)
                .await
                .map_err(|e| format!("Query for {:?} failed: {e}", args.name))?;

            if args.json {
                let body = serde_json::to_string_pretty(&report)
                    .map_err(|e| format!("Failed to encode report: {e}"))?;
                println!("{body}");
            } else {
                print!("{}", render_report(&report));
            }
            Ok(())
        }
        Command::Serve { port, sources } => {
            let config = build_source_config(sources)?;
            run_http_server(port, directory, config)
                .await
                .map_err(|e| format!("Server error: {e}"))
        }
    }
}

/// Human-readable summary, one figure per line, ending with the tier verdict.
pub fn render_report(report: &LifestyleReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", report.full_name));
    out.push_str(&format!("Working years = {}\n", report.working_years));
    out.push_str(&format!("Die at = {}\n", report.death_age));
    out.push_str(&format!("Retirement years = {}\n", report.retirement_years));
    out.push_str(&format!(
        "Super payout = {:.1} (median salaries)\n",
        report.super_balance
    ));
    out.push_str(&format!(
        "You live on {:.1}% of median salary\n",
        report.lifestyle_ratio * 100.0
    ));
    out.push_str(report.tier.message());
    out.push('\n');
    out
}

pub async fn run_http_server(
    port: u16,
    directory: PersonDirectory,
    sources: SourceConfig,
) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let state = AppState {
        pool: Pool::current(),
        directory: Arc::new(directory),
        sources,
    };
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "lifestyle HTTP API listening");

    axum::serve(listener, app).await
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/lifestyle", get(lifestyle_handler))
        .route("/api/names", get(names_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn names_handler(State(state): State<AppState>) -> Response {
    let names = state.directory.names().map(str::to_string).collect();
    json_response(StatusCode::OK, NamesResponse { names })
}

async fn lifestyle_handler(
    State(state): State<AppState>,
    Query(params): Query<LifestyleParams>,
) -> Response {
    let Some(name) = params.name.filter(|n| !n.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "missing required parameter: name");
    };

    let config = SourceConfig {
        seed: params.seed.or(state.sources.seed),
        ..state.sources
    };
    let providers = Arc::new(SimulatedProviders::new((*state.directory).clone(), config));

    match run_query(&state.pool, providers, &name).await {
        Ok(report) => json_response(StatusCode::OK, report),
        Err(err) => {
            warn!(%name, error = %err, "lifestyle query failed");
            error_response(status_for_error(&err), &err.to_string())
        }
    }
}

fn status_for_error(err: &LifestyleError) -> StatusCode {
    match err.root_cause() {
        LifestyleError::SourceUnavailable(_) => StatusCode::NOT_FOUND,
        LifestyleError::UnknownStrategy(_) | LifestyleError::DivisionByZero { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LifestyleError::CombinationFailure { .. } | LifestyleError::Abandoned(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
