//! Testing utilities: graph builders, run helpers, and matching assertions.
//!
//! Everything a pipeline of tests needs to exercise the engine end-to-end:
//! build a graph, run it at some process count and partition strategy, and
//! assert the two properties that define a correct result — validity (every
//! pair is an input edge, no vertex twice) and maximality (no input edge
//! joins two unmatched vertices).
//!
//! The random builder drives a seeded xorshift generator, so every "random"
//! case is reproducible from its seed.

use crate::edgelist::EdgeList;
use crate::engine::{EngineConfig, run};
use crate::nid::Nid;
use crate::partition::Partition;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::Write;
use tempfile::NamedTempFile;

/// A path `0 - 1 - … - (n-1)`.
pub fn path_graph(n: Nid) -> EdgeList {
    EdgeList::new(n, (1..n).map(|v| (v - 1, v)).collect())
}

/// A cycle over `n` vertices.
pub fn cycle_graph(n: Nid) -> EdgeList {
    let mut edges: Vec<(Nid, Nid)> = (1..n).map(|v| (v - 1, v)).collect();
    if n >= 3 {
        edges.push((n - 1, 0));
    }
    EdgeList::new(n, edges)
}

/// A star: center 0 with `leaves` leaves.
pub fn star_graph(leaves: Nid) -> EdgeList {
    EdgeList::new(leaves + 1, (1..=leaves).map(|leaf| (0, leaf)).collect())
}

/// The complete graph `K_n`.
pub fn complete_graph(n: Nid) -> EdgeList {
    let mut edges = Vec::new();
    for u in 0..n {
        for v in (u + 1)..n {
            edges.push((u, v));
        }
    }
    EdgeList::new(n, edges)
}

/// Deterministic xorshift64* generator for reproducible random cases.
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }

    pub fn below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }
}

/// A random simple graph with up to `n_edges` distinct edges.
pub fn random_graph(n: Nid, n_edges: usize, seed: u64) -> EdgeList {
    if n < 2 {
        return EdgeList::new(n, Vec::new());
    }
    let mut rng = XorShift::new(seed);
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    // Distinct pairs may run out before n_edges; bound the attempts.
    for _ in 0..n_edges.saturating_mul(8) {
        if edges.len() == n_edges {
            break;
        }
        let u = rng.below(n as u64) as Nid;
        let v = rng.below(n as u64) as Nid;
        if u == v {
            continue;
        }
        let key = (u.min(v), u.max(v));
        if seen.insert(key) {
            edges.push(key);
        }
    }
    EdgeList::new(n, edges)
}

/// Run the engine and return the union of all processes' matchings, sorted
/// with each pair normalized small-id-first.
pub fn run_matching(
    input: &EdgeList,
    n_procs: usize,
    partition: Partition,
) -> Result<Vec<(Nid, Nid)>> {
    let outcomes = run(EngineConfig { n_procs, partition }, input)?;
    let mut matching: Vec<(Nid, Nid)> = outcomes
        .into_iter()
        .flat_map(|o| o.matching)
        .map(|(a, b)| (a.min(b), a.max(b)))
        .collect();
    matching.sort_unstable();
    Ok(matching)
}

/// Assert the matching is valid: every pair is an input edge and no vertex
/// appears in more than one pair.
pub fn assert_valid_matching(input: &EdgeList, matching: &[(Nid, Nid)]) {
    let edges: HashSet<(Nid, Nid)> = input
        .edges
        .iter()
        .map(|&(u, v)| (u.min(v), u.max(v)))
        .collect();
    let mut used = HashSet::new();
    for &(a, b) in matching {
        let key = (a.min(b), a.max(b));
        assert!(
            edges.contains(&key),
            "matched pair {key:?} is not an input edge"
        );
        assert!(used.insert(a), "vertex {a} matched twice");
        assert!(used.insert(b), "vertex {b} matched twice");
    }
}

/// Assert the matching is maximal: no input edge has both ends unmatched.
pub fn assert_maximal_matching(input: &EdgeList, matching: &[(Nid, Nid)]) {
    let matched: HashSet<Nid> = matching.iter().flat_map(|&(a, b)| [a, b]).collect();
    for &(u, v) in &input.edges {
        assert!(
            matched.contains(&u) || matched.contains(&v),
            "edge ({u}, {v}) could still be added to the matching"
        );
    }
}

/// Write the graph in input format to a temp file (for feeding the binary or
/// exercising file-based parsing).
pub fn write_input_file(input: &EdgeList) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new().context("creating temp input file")?;
    file.write_all(input.to_text().as_bytes())
        .context("writing temp input file")?;
    Ok(file)
}
