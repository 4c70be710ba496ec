//! Run statistics: how many rounds and how much traffic each phase took.
//!
//! The report is assembled from the per-process [`ProcessOutcome`]s after a
//! run, can be printed as a human summary, and serializes to JSON for
//! dashboards or regression baselines.
//!
//! ```no_run
//! use sidewinder::{EngineConfig, Partition, run};
//! use sidewinder::edgelist::EdgeList;
//! use sidewinder::stats::RunReport;
//! # fn main() -> anyhow::Result<()> {
//! let input = EdgeList::parse("4 3\n1 2\n2 3\n3 4\n")?;
//! let config = EngineConfig { n_procs: 2, partition: Partition::Block };
//! let outcomes = run(config, &input)?;
//! let report = RunReport::new(config, &outcomes);
//! report.print();
//! report.save_to_file("matching_stats.json")?;
//! # Ok(())
//! # }
//! ```

use crate::engine::{EngineConfig, ProcessOutcome};
use crate::partition::Partition;
use crate::rounds::LoopReport;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// One phase's loop totals.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct PhaseStats {
    pub rounds: usize,
    pub received: usize,
}

impl From<LoopReport> for PhaseStats {
    fn from(report: LoopReport) -> Self {
        Self {
            rounds: report.rounds,
            received: report.received,
        }
    }
}

/// Per-process phase breakdown.
#[derive(Clone, Debug, Serialize)]
pub struct ProcessStats {
    pub pid: usize,
    pub matches: usize,
    pub elimination: PhaseStats,
    pub formation: PhaseStats,
    pub extraction: PhaseStats,
    pub completion: PhaseStats,
}

/// The whole run, ready for printing or JSON export.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub n_procs: usize,
    pub partition: Partition,
    pub total_matches: usize,
    pub processes: Vec<ProcessStats>,
}

impl RunReport {
    pub fn new(config: EngineConfig, outcomes: &[ProcessOutcome]) -> Self {
        let processes: Vec<ProcessStats> = outcomes
            .iter()
            .map(|o| ProcessStats {
                pid: o.pid,
                matches: o.matching.len(),
                elimination: o.elimination.into(),
                formation: o.formation.into(),
                extraction: o.extraction.into(),
                completion: o.completion.into(),
            })
            .collect();
        Self {
            n_procs: config.n_procs,
            partition: config.partition,
            total_matches: processes.iter().map(|p| p.matches).sum(),
            processes,
        }
    }

    /// Render as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serializing the run report")
    }

    /// Print a human-readable summary to stderr.
    pub fn print(&self) {
        eprintln!(
            "run: {} processes, {:?} partition, {} matches",
            self.n_procs, self.partition, self.total_matches
        );
        for p in &self.processes {
            eprintln!(
                "  pid {}: {} matches | rounds e/f/x/c = {}/{}/{}/{} | received {}",
                p.pid,
                p.matches,
                p.elimination.rounds,
                p.formation.rounds,
                p.extraction.rounds,
                p.completion.rounds,
                p.elimination.received
                    + p.formation.received
                    + p.extraction.received
                    + p.completion.received,
            );
        }
    }

    /// Write the JSON report to a file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("writing run report to {}", path.as_ref().display()))
    }
}
