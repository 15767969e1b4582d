//! Persistence of aggregated results.
//!
//! The on-disk document is a JSON object mapping each experiment name to its ordered
//! per-state records. This layout is the stable contract the visualization side
//! consumes and must not change shape across harness versions. National tallies and
//! the party union are derivable, so they are recomputed on load rather than stored.

use snafu::prelude::*;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::harness::aggregate::{AggregatedResults, ResultsAggregator, StateResult};
use crate::harness::{
    HarnessResult, ResultsEncodeSnafu, ResultsParseSnafu, ResultsReadSnafu, ResultsWriteSnafu,
};

type ResultsDocument = BTreeMap<String, Vec<StateResult>>;

fn document(results: &AggregatedResults) -> ResultsDocument {
    results
        .experiments
        .iter()
        .map(|(name, experiment)| (name.clone(), experiment.states.clone()))
        .collect()
}

/// The persisted form of the results, as pretty JSON.
pub fn document_string(results: &AggregatedResults) -> HarnessResult<String> {
    serde_json::to_string_pretty(&document(results)).context(ResultsEncodeSnafu {})
}

/// Writes the results to `path`, overwriting atomically: the document goes to a
/// sibling temporary file first and is renamed into place, so a failure mid-write
/// never leaves a partial results file behind.
pub fn save(results: &AggregatedResults, path: &Path) -> HarnessResult<()> {
    let contents = document_string(results)?;
    let file_name = match path.file_name() {
        Some(name) => name.to_string_lossy().to_string(),
        None => whatever!("results path {} has no file name", path.display()),
    };
    let tmp = path.with_file_name(format!("{}.tmp", file_name));
    fs::write(&tmp, contents).context(ResultsWriteSnafu {
        path: tmp.display().to_string(),
    })?;
    fs::rename(&tmp, path).context(ResultsWriteSnafu {
        path: path.display().to_string(),
    })?;
    Ok(())
}

/// Reads a results file back, replaying it through the aggregator so the loaded
/// value carries the same national tallies and party union as the original.
pub fn load(path: &Path) -> HarnessResult<AggregatedResults> {
    let display = path.display().to_string();
    let contents = fs::read_to_string(path).context(ResultsReadSnafu {
        path: display.clone(),
    })?;
    let doc: ResultsDocument =
        serde_json::from_str(&contents).context(ResultsParseSnafu { path: display })?;

    let mut aggregator = ResultsAggregator::new();
    for (experiment, states) in doc {
        for state_result in states {
            aggregator.record_run(&experiment, &state_result.state, state_result.results)?;
        }
    }
    Ok(aggregator.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{HarnessError, PartyTally};

    fn sample() -> AggregatedResults {
        let mut agg = ResultsAggregator::new();
        let mut t1 = PartyTally::new();
        t1.insert("ALP".to_string(), 4);
        t1.insert("LIB".to_string(), 5);
        agg.record_run("baseline", "NSW", t1).unwrap();
        let mut t2 = PartyTally::new();
        t2.insert("GRN".to_string(), 1);
        agg.record_run("baseline", "TAS", t2).unwrap();
        let mut t3 = PartyTally::new();
        t3.insert("ALP".to_string(), 6);
        agg.record_run("bump_1", "NSW", t3).unwrap();
        agg.finalize()
    }

    #[test]
    fn round_trip_preserves_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let original = sample();
        save(&original, &path).unwrap();
        let reloaded = load(&path).unwrap();
        assert_eq!(reloaded, original);
    }

    #[test]
    fn save_overwrites_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, "not json at all").unwrap();
        let original = sample();
        save(&original, &path).unwrap();
        assert_eq!(load(&path).unwrap(), original);
        // No temporary file left behind.
        assert!(!dir.path().join("out.json.tmp").exists());
    }

    #[test]
    fn document_shape_matches_the_visualization_contract() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        save(&sample(), &path).unwrap();

        let js: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let baseline = js["baseline"].as_array().unwrap();
        assert_eq!(baseline.len(), 2);
        assert_eq!(baseline[0]["state"], "NSW");
        assert_eq!(baseline[0]["results"]["ALP"], 4);
        assert_eq!(baseline[1]["state"], "TAS");
        assert_eq!(baseline[1]["results"]["GRN"], 1);
    }

    #[test]
    fn load_missing_file_is_a_read_error() {
        assert!(matches!(
            load(Path::new("/definitely/not/here.json")),
            Err(HarnessError::ResultsRead { .. })
        ));
    }

    #[test]
    fn load_rejects_malformed_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, "{\"baseline\": 42}").unwrap();
        assert!(matches!(
            load(&path),
            Err(HarnessError::ResultsParse { .. })
        ));
    }
}
