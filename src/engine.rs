//! The engine facade: configuration, phase sequencing, and collection.
//!
//! [`run`] launches P SPMD workers over the in-process substrate and drives
//! each through the same sequence: scatter → load → singleton elimination →
//! snake formation → extraction → completion. Phase boundaries are exact:
//! every round loop ends by *global* quiescence, so all processes move to
//! the next phase in the same superstep and the barrier schedule never
//! diverges.
//!
//! The run's parameters travel in an explicit [`EngineConfig`] value — the
//! partition strategy and process count are per-run state, not globals.

use crate::bsp::{Bsp, run_spmd};
use crate::completion::Completion;
use crate::edgelist::EdgeList;
use crate::graph::LocalGraph;
use crate::nid::Nid;
use crate::pairing::Extraction;
use crate::partition::Partition;
use crate::phase1::SingletonElimination;
use crate::rounds::{LoopReport, drive};
use crate::scatter::scatter;
use crate::snake::SnakeFormation;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-run parameters, threaded through every operation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    pub n_procs: usize,
    pub partition: Partition,
}

/// One process's results: its slice of the matching plus per-phase loop
/// reports. The union of all matchings is the final matching.
#[derive(Clone, Debug)]
pub struct ProcessOutcome {
    pub pid: usize,
    pub matching: Vec<(Nid, Nid)>,
    pub elimination: LoopReport,
    pub formation: LoopReport,
    pub extraction: LoopReport,
    pub completion: LoopReport,
}

/// Run the full matching engine; outcomes come back in pid order.
pub fn run(config: EngineConfig, input: &EdgeList) -> Result<Vec<ProcessOutcome>> {
    if config.n_procs == 0 {
        bail!("cannot run on zero processes");
    }
    run_spmd(config.n_procs, |bsp| {
        let input = (bsp.pid() == 0).then_some(input);
        worker(&bsp, config, input)
    })
}

fn worker(bsp: &Bsp, config: EngineConfig, input: Option<&EdgeList>) -> Result<ProcessOutcome> {
    let (n_global, edges) = scatter(bsp, config.partition, input)?;
    let mut graph = LocalGraph::load(n_global, bsp.pid(), bsp.n_procs(), config.partition, &edges);
    debug!(
        pid = bsp.pid(),
        vertices = graph.len(),
        edges = edges.len(),
        "local graph loaded"
    );

    let elimination = drive(bsp, &mut graph, &mut SingletonElimination::new())?;
    debug!(pid = bsp.pid(), rounds = elimination.rounds, "singleton elimination quiesced");

    let mut formation = SnakeFormation::new();
    let formation_report = drive(bsp, &mut graph, &mut formation)?;
    debug!(pid = bsp.pid(), rounds = formation_report.rounds, "snake formation quiesced");

    let mut extraction = Extraction::new(formation.into_pen());
    let extraction_report = drive(bsp, &mut graph, &mut extraction)?;
    debug!(pid = bsp.pid(), rounds = extraction_report.rounds, "extraction quiesced");

    let completion = drive(bsp, &mut graph, &mut Completion::new())?;
    debug!(
        pid = bsp.pid(),
        rounds = completion.rounds,
        matches = graph.matching().len(),
        "completion quiesced"
    );

    Ok(ProcessOutcome {
        pid: bsp.pid(),
        matching: graph.take_matching(),
        elimination,
        formation: formation_report,
        extraction: extraction_report,
        completion,
    })
}
