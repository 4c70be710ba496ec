//! The stats report: assembly, JSON shape, and file round-trip.

#![cfg(feature = "stats")]

use anyhow::Result;
use sidewinder::stats::RunReport;
use sidewinder::testing::*;
use sidewinder::{EngineConfig, Partition, run};

#[test]
fn report_totals_match_the_outcomes() -> Result<()> {
    let input = cycle_graph(8);
    let config = EngineConfig {
        n_procs: 2,
        partition: Partition::Block,
    };
    let outcomes = run(config, &input)?;
    let report = RunReport::new(config, &outcomes);

    assert_eq!(report.n_procs, 2);
    assert_eq!(
        report.total_matches,
        outcomes.iter().map(|o| o.matching.len()).sum::<usize>()
    );
    assert_eq!(report.processes.len(), 2);
    for (process, outcome) in report.processes.iter().zip(&outcomes) {
        assert_eq!(process.pid, outcome.pid);
        assert_eq!(process.matches, outcome.matching.len());
        assert_eq!(process.elimination.rounds, outcome.elimination.rounds);
    }
    Ok(())
}

#[test]
fn report_serializes_and_round_trips_through_a_file() -> Result<()> {
    let input = path_graph(6);
    let config = EngineConfig {
        n_procs: 3,
        partition: Partition::Cyclic,
    };
    let outcomes = run(config, &input)?;
    let report = RunReport::new(config, &outcomes);

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("report.json");
    report.save_to_file(&path)?;

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(value["n_procs"], 3);
    assert_eq!(value["partition"], "cyclic");
    assert_eq!(
        value["total_matches"].as_u64().unwrap() as usize,
        report.total_matches
    );
    assert_eq!(value["processes"].as_array().unwrap().len(), 3);
    Ok(())
}
