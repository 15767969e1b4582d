//! One synchronous invocation of the external counting engine per (state, experiment)
//! pair. The engine is an opaque child process; only its argument order and its exit
//! status are contractual here.

use log::debug;
use snafu::prelude::*;

use std::path::PathBuf;
use std::process::Command;

use crate::harness::matrix::{ExperimentMatrix, ExperimentSpec, StateSpec};
use crate::harness::{EngineFailureSnafu, EngineSpawnSnafu, HarnessResult};

/// Everything the engine needs for one run. Built per iteration, not retained.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunRequest {
    pub state_id: String,
    pub seats: u32,
    pub experiment: String,
    pub variant_id: u32,
    pub candidate_ordering: PathBuf,
    pub state_data: PathBuf,
}

impl RunRequest {
    pub fn new(
        state: &StateSpec,
        experiment: &ExperimentSpec,
        matrix: &ExperimentMatrix,
    ) -> RunRequest {
        RunRequest {
            state_id: state.id.clone(),
            seats: state.seats,
            experiment: experiment.name.clone(),
            variant_id: experiment.id,
            candidate_ordering: matrix.candidate_ordering_path(),
            state_data: matrix.state_data_path(state),
        }
    }
}

/// The raw text captured from one engine run.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunOutput {
    pub stdout: String,
}

/// Runs the engine once and captures its standard output.
///
/// `engine` is the command prefix (program plus fixed leading arguments); the five
/// positional arguments are appended in the order the engine expects: candidate
/// ordering path, state data path, state identifier, seat count, variant identifier.
/// A non-zero exit is fatal and carries the exit code and captured stderr.
pub fn invoke(engine: &[String], request: &RunRequest) -> HarnessResult<RunOutput> {
    let (program, leading) = match engine.split_first() {
        Some(x) => x,
        None => whatever!("empty engine command"),
    };
    let mut command = Command::new(program);
    command.args(leading);
    command
        .arg(&request.candidate_ordering)
        .arg(&request.state_data)
        .arg(&request.state_id)
        .arg(request.seats.to_string())
        .arg(request.variant_id.to_string());
    debug!("engine command: {:?}", command);

    let output = command.output().context(EngineSpawnSnafu {
        command: program.clone(),
    })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return EngineFailureSnafu {
            state: request.state_id.clone(),
            experiment: request.experiment.clone(),
            code: output.status.code().unwrap_or(-1),
            stderr,
        }
        .fail();
    }
    Ok(RunOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
    })
}
