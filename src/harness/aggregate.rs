//! Accumulates per-run tallies into per-experiment national totals and normalizes
//! the party vocabulary across every experiment in the sweep.
//!
//! The accumulator is an owned value threaded through the sweep, so its lifecycle
//! (created at sweep start, finalized once, persisted) is visible at every call site.

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use std::collections::{BTreeMap, BTreeSet};

use crate::harness::{DuplicateRunSnafu, HarnessResult, PartyTally};

/// The outcome for one state within one experiment.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StateResult {
    pub state: String,
    pub results: PartyTally,
}

/// One experiment's per-state results plus its national tally.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ExperimentResult {
    /// Per-state results, in the order the states were recorded.
    pub states: Vec<StateResult>,
    /// Sum over all states. After normalization this contains every party
    /// observed anywhere in the sweep, absent parties at zero.
    pub national: PartyTally,
}

/// The finalized, read-only result set for a whole sweep.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AggregatedResults {
    pub experiments: BTreeMap<String, ExperimentResult>,
    /// Union of every party identifier observed across all runs.
    pub parties: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct ResultsAggregator {
    runs: BTreeMap<String, Vec<StateResult>>,
}

impl ResultsAggregator {
    pub fn new() -> ResultsAggregator {
        ResultsAggregator::default()
    }

    /// Records one completed run. At most one run per (experiment, state) pair:
    /// a duplicate indicates a harness bug and fails without mutating anything.
    pub fn record_run(
        &mut self,
        experiment: &str,
        state: &str,
        tally: PartyTally,
    ) -> HarnessResult<()> {
        let entries = self.runs.entry(experiment.to_string()).or_default();
        ensure!(
            !entries.iter().any(|e| e.state == state),
            DuplicateRunSnafu { experiment, state }
        );
        entries.push(StateResult {
            state: state.to_string(),
            results: tally,
        });
        Ok(())
    }

    /// Computes national tallies and normalizes the party vocabulary.
    ///
    /// A pure function of the recorded runs: calling it twice without an
    /// intervening `record_run` yields identical results.
    pub fn finalize(&self) -> AggregatedResults {
        let mut experiments: BTreeMap<String, ExperimentResult> = BTreeMap::new();
        let mut parties: BTreeSet<String> = BTreeSet::new();

        for (name, states) in &self.runs {
            let mut national = PartyTally::new();
            for state_result in states {
                for (party, seats) in &state_result.results {
                    *national.entry(party.clone()).or_insert(0) += seats;
                    parties.insert(party.clone());
                }
            }
            experiments.insert(
                name.clone(),
                ExperimentResult {
                    states: states.clone(),
                    national,
                },
            );
        }

        // Every experiment reports every party, absentees at zero.
        for experiment in experiments.values_mut() {
            for party in &parties {
                experiment.national.entry(party.clone()).or_insert(0);
            }
        }

        AggregatedResults {
            experiments,
            parties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::HarnessError;

    fn tally(pairs: &[(&str, u64)]) -> PartyTally {
        pairs
            .iter()
            .map(|(p, n)| (p.to_string(), *n))
            .collect()
    }

    #[test]
    fn national_tally_sums_states() {
        let mut agg = ResultsAggregator::new();
        agg.record_run("baseline", "X", tally(&[("PartyA", 1), ("PartyB", 1)]))
            .unwrap();
        agg.record_run("baseline", "Y", tally(&[("PartyA", 1)]))
            .unwrap();
        let results = agg.finalize();
        let national = &results.experiments["baseline"].national;
        assert_eq!(national["PartyA"], 2);
        assert_eq!(national["PartyB"], 1);
    }

    #[test]
    fn normalization_zero_fills_absent_parties() {
        let mut agg = ResultsAggregator::new();
        agg.record_run("baseline", "X", tally(&[("PartyA", 1), ("PartyB", 1)]))
            .unwrap();
        agg.record_run("baseline", "Y", tally(&[("PartyA", 1)]))
            .unwrap();
        agg.record_run("alt", "X", tally(&[("PartyC", 1)])).unwrap();
        let results = agg.finalize();

        let baseline = &results.experiments["baseline"].national;
        assert_eq!(baseline["PartyA"], 2);
        assert_eq!(baseline["PartyB"], 1);
        assert_eq!(baseline["PartyC"], 0);
        let alt = &results.experiments["alt"].national;
        assert_eq!(alt["PartyA"], 0);
        assert_eq!(alt["PartyB"], 0);
        assert_eq!(alt["PartyC"], 1);

        // Same key set everywhere.
        for experiment in results.experiments.values() {
            let keys: Vec<&String> = experiment.national.keys().collect();
            let union: Vec<&String> = results.parties.iter().collect();
            assert_eq!(keys, union);
        }
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut agg = ResultsAggregator::new();
        agg.record_run("baseline", "X", tally(&[("PartyA", 2)]))
            .unwrap();
        agg.record_run("alt", "X", tally(&[("PartyB", 1)])).unwrap();
        assert_eq!(agg.finalize(), agg.finalize());
    }

    #[test]
    fn duplicate_run_fails_and_leaves_state_unchanged() {
        let mut agg = ResultsAggregator::new();
        agg.record_run("baseline", "X", tally(&[("PartyA", 1)]))
            .unwrap();
        let before = agg.finalize();

        let res = agg.record_run("baseline", "X", tally(&[("PartyB", 5)]));
        match res {
            Err(HarnessError::DuplicateRun { experiment, state }) => {
                assert_eq!(experiment, "baseline");
                assert_eq!(state, "X");
            }
            other => panic!("expected DuplicateRun, got {:?}", other),
        }
        assert_eq!(agg.finalize(), before);
    }

    #[test]
    fn same_state_in_different_experiments_is_fine() {
        let mut agg = ResultsAggregator::new();
        agg.record_run("baseline", "X", tally(&[("PartyA", 1)]))
            .unwrap();
        agg.record_run("alt", "X", tally(&[("PartyA", 1)])).unwrap();
        assert_eq!(agg.finalize().experiments.len(), 2);
    }

    #[test]
    fn empty_tallies_are_recorded_but_add_no_parties() {
        let mut agg = ResultsAggregator::new();
        agg.record_run("baseline", "X", PartyTally::new()).unwrap();
        let results = agg.finalize();
        assert!(results.parties.is_empty());
        assert!(results.experiments["baseline"].national.is_empty());
        assert_eq!(results.experiments["baseline"].states.len(), 1);
    }

    #[test]
    fn state_order_follows_recording_order() {
        let mut agg = ResultsAggregator::new();
        agg.record_run("baseline", "ACT", tally(&[("PartyA", 1)]))
            .unwrap();
        agg.record_run("baseline", "NSW", tally(&[("PartyA", 1)]))
            .unwrap();
        let results = agg.finalize();
        let order: Vec<&str> = results.experiments["baseline"]
            .states
            .iter()
            .map(|s| s.state.as_str())
            .collect();
        assert_eq!(order, vec!["ACT", "NSW"]);
    }
}
