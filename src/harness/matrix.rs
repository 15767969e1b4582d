//! The experiment matrix: which states to count, for how many seats, and which
//! preference-ordering variants to run the engine with.

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::PathBuf;

use crate::harness::{
    ConfigParseSnafu, ConfigReadSnafu, HarnessResult, InvalidConfigSnafu, UnknownStateSnafu,
};

/// One jurisdiction to run the engine for.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StateSpec {
    pub id: String,
    pub seats: u32,
}

/// One perturbation of the candidate preference ordering. The `id` is passed
/// opaquely to the engine.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSpec {
    pub name: String,
    pub id: u32,
}

/// The sweep configuration, as found on disk.
///
/// Experiments are an array rather than an object so that their declaration
/// order survives JSON.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub states: BTreeMap<String, u32>,
    pub experiments: Vec<ExperimentSpec>,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_engine")]
    pub engine: Vec<String>,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_engine() -> Vec<String> {
    ["cargo", "run", "--release", "--bin", "election2016", "--"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ExperimentMatrix {
    states: Vec<StateSpec>,
    experiments: Vec<ExperimentSpec>,
    data_dir: PathBuf,
    engine: Vec<String>,
}

impl ExperimentMatrix {
    pub fn load(path: &str) -> HarnessResult<ExperimentMatrix> {
        let contents = fs::read_to_string(path).context(ConfigReadSnafu { path })?;
        let config: SweepConfig =
            serde_json::from_str(&contents).context(ConfigParseSnafu { path })?;
        ExperimentMatrix::from_config(config)
    }

    pub fn from_config(config: SweepConfig) -> HarnessResult<ExperimentMatrix> {
        ensure!(
            !config.states.is_empty(),
            InvalidConfigSnafu {
                message: "no states configured"
            }
        );
        ensure!(
            !config.experiments.is_empty(),
            InvalidConfigSnafu {
                message: "no experiments configured"
            }
        );
        ensure!(
            !config.engine.is_empty(),
            InvalidConfigSnafu {
                message: "empty engine command"
            }
        );
        for (id, seats) in &config.states {
            ensure!(
                *seats > 0,
                InvalidConfigSnafu {
                    message: format!("state {} has no seats to fill", id)
                }
            );
        }
        let mut names: HashSet<&str> = HashSet::new();
        for experiment in &config.experiments {
            ensure!(
                names.insert(experiment.name.as_str()),
                InvalidConfigSnafu {
                    message: format!("duplicate experiment name {}", experiment.name)
                }
            );
        }

        // BTreeMap iteration gives the lexicographic state order directly.
        let states = config
            .states
            .iter()
            .map(|(id, seats)| StateSpec {
                id: id.clone(),
                seats: *seats,
            })
            .collect();
        Ok(ExperimentMatrix {
            states,
            experiments: config.experiments,
            data_dir: PathBuf::from(config.data_dir),
            engine: config.engine,
        })
    }

    /// All configured states, lexicographic by identifier.
    pub fn states(&self) -> &[StateSpec] {
        &self.states
    }

    /// The requested subset of states, still lexicographic and deduplicated.
    /// Fails if any identifier is not configured.
    pub fn select_states(&self, ids: &[String]) -> HarnessResult<Vec<StateSpec>> {
        let mut selected: Vec<StateSpec> = Vec::new();
        for id in ids {
            match self.states.iter().find(|s| &s.id == id) {
                Some(state) => selected.push(state.clone()),
                None => return UnknownStateSnafu { id }.fail(),
            }
        }
        selected.sort_by(|a, b| a.id.cmp(&b.id));
        selected.dedup_by(|a, b| a.id == b.id);
        Ok(selected)
    }

    /// All experiment variants, in declaration order.
    pub fn experiments(&self) -> &[ExperimentSpec] {
        &self.experiments
    }

    pub fn engine(&self) -> &[String] {
        &self.engine
    }

    pub fn candidate_ordering_path(&self) -> PathBuf {
        self.data_dir.join("candidate_ordering.csv")
    }

    pub fn state_data_path(&self, state: &StateSpec) -> PathBuf {
        self.data_dir.join(format!("{}.csv", state.id))
    }
}
