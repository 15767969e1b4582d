use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};

use std::path::Path;

use text_diff::print_diff;

use crate::args::Args;
use crate::harness::aggregate::{AggregatedResults, ResultsAggregator};
use crate::harness::invoker::RunRequest;
use crate::harness::matrix::ExperimentMatrix;

pub mod aggregate;
pub mod invoker;
pub mod matrix;
pub mod parser;
pub mod store;

/// Seats won by each party in one engine run.
pub type PartyTally = std::collections::BTreeMap<String, u64>;

#[derive(Debug, Snafu)]
pub enum HarnessError {
    #[snafu(display("Error reading configuration file {path}"))]
    ConfigRead {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing configuration file {path}"))]
    ConfigParse {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Invalid configuration: {message}"))]
    InvalidConfig { message: String },
    #[snafu(display("Unknown state {id} requested"))]
    UnknownState { id: String },

    #[snafu(display("Failed to launch the counting engine {command}"))]
    EngineSpawn {
        source: std::io::Error,
        command: String,
    },
    #[snafu(display(
        "Counting engine failed for state {state} (experiment {experiment}) with exit code {code}: {stderr}"
    ))]
    EngineFailure {
        state: String,
        experiment: String,
        code: i32,
        stderr: String,
    },

    #[snafu(display("Cannot extract a party code from elected line {line:?}"))]
    MalformedOutput { line: String },

    #[snafu(display("Run recorded twice for experiment {experiment}, state {state}"))]
    DuplicateRun { experiment: String, state: String },

    #[snafu(display("Error writing results to {path}"))]
    ResultsWrite {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading results from {path}"))]
    ResultsRead {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing results file {path}"))]
    ResultsParse {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error encoding results"))]
    ResultsEncode { source: serde_json::Error },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type HarnessResult<T> = Result<T, HarnessError>;

/// Runs the full sweep: every experiment variant over every selected state, in order,
/// one synchronous engine invocation per pair. The aggregated results are written to
/// `args.out` only once the whole sweep has completed; any failure aborts the sweep
/// and leaves the output untouched.
pub fn run_sweep(args: &Args) -> HarnessResult<()> {
    let matrix = ExperimentMatrix::load(&args.config)?;

    let states = if args.states.is_empty() {
        matrix.states().to_vec()
    } else {
        matrix.select_states(&args.states)?
    };

    let mut aggregator = ResultsAggregator::new();

    for experiment in matrix.experiments() {
        info!(
            "Starting experiment {} (variant {})",
            experiment.name, experiment.id
        );
        for state in &states {
            info!(
                "Running election for {} (experiment {})",
                state.id, experiment.name
            );
            let request = RunRequest::new(state, experiment, &matrix);
            let output = invoker::invoke(matrix.engine(), &request)?;
            let tally = parser::parse(&output.stdout)?;
            if tally.is_empty() {
                warn!(
                    "Empty tally for state {} in experiment {}: the engine output may be missing the elected section",
                    state.id, experiment.name
                );
            }
            aggregator.record_run(&experiment.name, &state.id, tally)?;
            info!("Completed election for {}", state.id);
        }
    }

    let results = aggregator.finalize();
    log_national_totals(&results);

    store::save(&results, Path::new(&args.out))?;
    info!("Results written to {}", args.out);

    if let Some(reference) = &args.reference {
        check_reference(&results, reference)?;
    }

    Ok(())
}

fn log_national_totals(results: &AggregatedResults) {
    for (name, experiment) in &results.experiments {
        let total: u64 = experiment.national.values().sum();
        info!(
            "experiment {}: {} seats filled across {} states",
            name,
            total,
            experiment.states.len()
        );
        for (party, seats) in &experiment.national {
            debug!("  {} {}", party, seats);
        }
    }
}

/// Compares the aggregated results against a previously persisted reference file,
/// printing a diff of the two JSON documents on mismatch.
fn check_reference(results: &AggregatedResults, reference_path: &str) -> HarnessResult<()> {
    let reference = store::load(Path::new(reference_path))?;
    if &reference != results {
        warn!("Found differences with the reference results");
        let expected = store::document_string(&reference)?;
        let computed = store::document_string(results)?;
        print_diff(expected.as_str(), computed.as_str(), "\n");
        whatever!(
            "Difference detected between computed results and the reference results in {}",
            reference_path
        );
    }
    Ok(())
}
