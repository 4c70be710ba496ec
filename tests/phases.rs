//! White-box checks of the singleton-elimination phase: matchings, cascade
//! cleanliness, cross-partition adjacency symmetry, and quiescence stability.

use anyhow::Result;
use sidewinder::Partition;
use sidewinder::bsp::run_spmd;
use sidewinder::edgelist::EdgeList;
use sidewinder::graph::LocalGraph;
use sidewinder::nid::Nid;
use sidewinder::phase1::SingletonElimination;
use sidewinder::rounds::{LoopReport, drive};
use std::collections::HashMap;

struct ProcessState {
    matching: Vec<(Nid, Nid)>,
    adjacency: Vec<(Nid, Vec<Nid>)>,
    first: LoopReport,
    rerun: LoopReport,
}

/// Run only Phase I; every process loads its slice straight from the full
/// edge list (ownership filtering is the loader's job).
fn run_phase1(input: &EdgeList, n_procs: usize, partition: Partition) -> Result<Vec<ProcessState>> {
    run_spmd(n_procs, |bsp| {
        let mut graph = LocalGraph::load(
            input.n_vertices,
            bsp.pid(),
            n_procs,
            partition,
            &input.edges,
        );
        let first = drive(&bsp, &mut graph, &mut SingletonElimination::new())?;
        // Quiescence is stable: a second pass over the same state must be a
        // single silent round.
        let rerun = drive(&bsp, &mut graph, &mut SingletonElimination::new())?;
        let adjacency = graph
            .vertices()
            .iter()
            .map(|v| {
                let mut neighbors = v.neighbors.clone();
                neighbors.sort_unstable();
                (v.id, neighbors)
            })
            .collect();
        Ok(ProcessState {
            matching: graph.take_matching(),
            adjacency,
            first,
            rerun,
        })
    })
}

fn union(states: &[ProcessState]) -> Vec<(Nid, Nid)> {
    let mut all: Vec<(Nid, Nid)> = states
        .iter()
        .flat_map(|s| s.matching.iter())
        .map(|&(a, b)| (a.min(b), a.max(b)))
        .collect();
    all.sort_unstable();
    all
}

#[test]
fn path_collapses_completely() -> Result<()> {
    let input = EdgeList::parse("4 3\n1 2\n2 3\n3 4\n")?;
    let states = run_phase1(&input, 2, Partition::Block)?;
    assert_eq!(union(&states), vec![(0, 1), (2, 3)]);
    for state in &states {
        assert!(state.adjacency.is_empty(), "nothing survives a path");
    }
    Ok(())
}

#[test]
fn symmetric_claims_record_once() -> Result<()> {
    // Triangle 0-1-2 survives; the pendant pair 3-4 is split across the
    // partition and each endpoint claims the other in the same round.
    let input = EdgeList::new(5, vec![(0, 1), (1, 2), (0, 2), (3, 4)]);
    let states = run_phase1(&input, 2, Partition::Cyclic)?;
    assert_eq!(union(&states), vec![(3, 4)]);

    let survivors: Vec<Nid> = states
        .iter()
        .flat_map(|s| s.adjacency.iter().map(|(v, _)| *v))
        .collect();
    let mut sorted = survivors.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1, 2]);
    Ok(())
}

#[test]
fn cross_partition_adjacency_stays_symmetric() -> Result<()> {
    // Two triangles bridged by an edge: no singletons, Phase I must leave
    // the graph untouched and the sharded adjacency mutually consistent.
    let input = EdgeList::new(6, vec![
        (0, 1),
        (1, 2),
        (0, 2),
        (3, 4),
        (4, 5),
        (3, 5),
        (2, 3),
    ]);
    for partition in [Partition::Block, Partition::Cyclic] {
        for n_procs in [2, 3] {
            let states = run_phase1(&input, n_procs, partition)?;
            let mut neighbors: HashMap<Nid, Vec<Nid>> = HashMap::new();
            for state in &states {
                for (v, ns) in &state.adjacency {
                    neighbors.insert(*v, ns.clone());
                }
            }
            assert_eq!(neighbors.len(), 6, "no vertex may disappear");
            for (&u, ns) in &neighbors {
                for w in ns {
                    assert!(
                        neighbors[w].contains(&u),
                        "{partition:?}/{n_procs}: edge ({u}, {w}) not mirrored"
                    );
                }
            }
        }
    }
    Ok(())
}

#[test]
fn quiescence_is_stable() -> Result<()> {
    let input = EdgeList::new(7, vec![(0, 1), (1, 2), (2, 3), (4, 5), (5, 6)]);
    for states in [
        run_phase1(&input, 2, Partition::Block)?,
        run_phase1(&input, 3, Partition::Cyclic)?,
    ] {
        for state in &states {
            assert!(state.first.rounds >= 1);
            assert_eq!(state.rerun.rounds, 1, "a quiescent phase must stay quiet");
            assert_eq!(state.rerun.received, 0);
        }
    }
    Ok(())
}
