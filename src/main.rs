//! # cosmos-acctest
//!
//! Command-line entry point for the Cosmos DB Mongo collection acceptance harness.
//!
//! ## Usage
//!
//! ```bash
//! # Print the configuration a scenario renders to
//! cosmos-acctest render --scenario complete --ri 42
//!
//! # Run every lifecycle case against the in-memory backend
//! cosmos-acctest run --local
//!
//! # Run selected cases live (requires TF_ACC and ARM_SUBSCRIPTION_ID)
//! cosmos-acctest run --case basic --case update
//!
//! # Point lookup of one collection through ARM
//! cosmos-acctest lookup -g acctestRG-1 -a acctest-1 -d acctest-1 -n acctest-1
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cosmos_mongo_acctest::acceptance::mongo_collection;
use cosmos_mongo_acctest::config::load_config;
use cosmos_mongo_acctest::harness::{rand_time_int, ExistenceChecker, RunReport, TestCase};
use cosmos_mongo_acctest::model::ResourceKey;
use cosmos_mongo_acctest::observability::metrics;
use cosmos_mongo_acctest::provider::{AzureCollectionClient, InMemoryCosmos, LookupOutcome};
use cosmos_mongo_acctest::render::Scenario;
use cosmos_mongo_acctest::runtime::{self, Backend};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "cosmos-acctest")]
#[command(about = "Lifecycle acceptance harness for Cosmos DB Mongo collections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the configuration a scenario renders to
    Render {
        /// Scenario name (basic, complete, updated, debug, debug2)
        #[arg(short, long)]
        scenario: Scenario,

        /// Name suffix; a fresh one is generated when omitted
        #[arg(long)]
        ri: Option<i64>,

        /// Location (defaults to ARM_TEST_LOCATION)
        #[arg(short, long)]
        location: Option<String>,
    },
    /// Run lifecycle cases
    Run {
        /// Case to run (basic, complete, update, debug); repeatable, defaults to all but debug
        #[arg(short, long = "case")]
        cases: Vec<String>,

        /// Use the local orchestrator and an in-memory backend
        #[arg(long)]
        local: bool,

        /// Concurrent cases (defaults to ACCTEST_PARALLELISM)
        #[arg(short, long)]
        parallelism: Option<usize>,

        /// Print Prometheus metrics after the run
        #[arg(long)]
        metrics: bool,
    },
    /// Look up one collection through ARM
    Lookup {
        #[arg(short = 'g', long)]
        resource_group: String,

        #[arg(short, long)]
        account: String,

        #[arg(short, long)]
        database: String,

        #[arg(short, long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = load_config();

    match cli.command {
        Commands::Render {
            scenario,
            ri,
            location,
        } => {
            let ri = ri.unwrap_or_else(rand_time_int);
            let location = location.unwrap_or(config.location);
            print!("{}", scenario.render(ri, &location));
            Ok(())
        }
        Commands::Run {
            cases,
            local,
            parallelism,
            metrics: print_metrics,
        } => {
            let cases = select_cases(&cases)?;
            let parallelism = parallelism.unwrap_or(config.parallelism);
            let backend = if local {
                Backend::Local(InMemoryCosmos::new())
            } else {
                Backend::Live
            };

            let init = runtime::initialize(config, backend)?;
            if let Ok(path) = &dotenv {
                info!("Loaded environment from {}", path.display());
            }
            spawn_interrupt_handler(init.context.cancellation_token());

            let reports = init.driver.run_parallel(&cases, parallelism).await;
            init.context.teardown();

            if print_metrics {
                print!("{}", metrics::gather_text()?);
            }
            summarize(reports)
        }
        Commands::Lookup {
            resource_group,
            account,
            database,
            name,
        } => {
            runtime::install_crypto_provider();
            runtime::init_tracing();
            runtime::init_metrics();

            let client = AzureCollectionClient::new(&config)?;
            let checker = ExistenceChecker::new(
                Arc::new(client),
                config.lookup_timeout(),
                CancellationToken::new(),
            );
            let key = ResourceKey::new(resource_group, account, database, name);

            match checker.lookup(&key).await.context("Lookup failed")? {
                LookupOutcome::Found(attributes) => {
                    println!("{}", serde_json::to_string_pretty(&attributes.to_values())?);
                    Ok(())
                }
                LookupOutcome::NotFound => Err(anyhow::anyhow!("Collection {key} does not exist")),
            }
        }
    }
}

fn select_cases(names: &[String]) -> Result<Vec<TestCase>> {
    if names.is_empty() {
        return Ok(mongo_collection::all());
    }
    names
        .iter()
        .map(|name| {
            mongo_collection::case_by_name(name).with_context(|| {
                format!(
                    "Unknown case '{name}', expected one of: {}",
                    mongo_collection::CASE_NAMES.join(", ")
                )
            })
        })
        .collect()
}

/// Cancel in-flight steps on Ctrl-C; destroy phases still run
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling running steps");
            cancel.cancel();
        }
    });
}

fn summarize(reports: Vec<RunReport>) -> Result<()> {
    let total = reports.len();
    let mut failed = 0;
    for report in reports {
        let seconds = report.duration.as_secs_f64();
        let label = format!("{} (ri {})", report.case, report.ri);
        match report.into_result() {
            Ok(()) => println!("PASS {seconds:>8.1}s {label}"),
            Err(failure) => {
                failed += 1;
                println!("FAIL {seconds:>8.1}s {failure}");
            }
        }
    }

    if failed == 0 {
        println!("{total} case(s) passed");
        Ok(())
    } else {
        Err(anyhow::anyhow!("{failed} of {total} case(s) failed"))
    }
}
