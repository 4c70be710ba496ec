//! The completion sweep: greedy matching over whatever the snakes left.
//!
//! Every vertex still in the graph at this point is unmatched, and its
//! adjacency names only other unmatched vertices (matched ones cascaded
//! `DELETE`s on their way out). Each round, every vertex courts its
//! smallest surviving neighbor; a pair forms exactly when the choice is
//! mutual. Local mutual pairs resolve on the spot; cross-partition
//! proposals travel as `MOVE` and are re-issued every round until the
//! picture changes.
//!
//! Following smallest-neighbor pointers strictly descends every second hop,
//! so some pair is always mutual while any edge survives — the sweep makes
//! progress every round (modulo one round of DELETE latency) and ends with
//! no edge joining two unmatched vertices. That is exactly maximality, and
//! it holds no matter how much or how little the snake phase achieved.
//!
//! A proposal is *not* a commitment to wait: an unanswered proposal expires
//! with the round, and its sender stays in the graph. The pair is recorded
//! by the owner of the smaller endpoint, matching the convention everywhere
//! else.

use crate::graph::LocalGraph;
use crate::instruction::Instruction;
use crate::nid::Nid;
use crate::outbox::Outbox;
use crate::rounds::RoundStep;
use anyhow::Result;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Round driver for the completion sweep.
#[derive(Default)]
pub struct Completion {
    /// Proposals sent in the current round: proposer → courted neighbor.
    sent: HashMap<Nid, Nid>,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    fn smallest_neighbor(graph: &LocalGraph, v: Nid) -> Option<Nid> {
        graph.vertex(v).and_then(|vx| vx.neighbors.iter().copied().min())
    }

    /// Match local mutual-smallest pairs until none remain. Within one
    /// process this fully resolves every purely-local component: the
    /// smallest vertex of a component is always its neighbor's best choice.
    fn match_local(graph: &mut LocalGraph, outbox: &mut Outbox) {
        loop {
            let pair = graph.vertices().iter().find_map(|vx| {
                let u = vx.id;
                let w = vx.neighbors.iter().copied().min()?;
                if graph.owner_of(w) != graph.pid() {
                    return None;
                }
                (Self::smallest_neighbor(graph, w) == Some(u)).then_some((u, w))
            });
            let Some((u, w)) = pair else {
                return;
            };
            graph.insert_match(u, w);
            graph.remove_vertex(u, outbox);
            graph.remove_vertex(w, outbox);
        }
    }
}

impl RoundStep for Completion {
    fn local(&mut self, graph: &mut LocalGraph, outbox: &mut Outbox) -> Result<()> {
        self.sent.clear();
        graph.remove_empty_vertices();
        Self::match_local(graph, outbox);

        let proposals: Vec<(Nid, Nid)> = graph
            .vertices()
            .iter()
            .filter_map(|vx| {
                let w = vx.neighbors.iter().copied().min()?;
                (graph.owner_of(w) != graph.pid()).then_some((vx.id, w))
            })
            .collect();
        for (u, w) in proposals {
            outbox.add(graph.owner_of(w), Instruction::Move {
                node: u,
                neighbor: w,
            });
            self.sent.insert(u, w);
        }
        Ok(())
    }

    fn apply(
        &mut self,
        src: usize,
        ins: Instruction,
        graph: &mut LocalGraph,
        outbox: &mut Outbox,
    ) -> Result<()> {
        match ins {
            Instruction::Delete { node, neighbor } => {
                graph.apply_remote_delete(src, node, neighbor);
            }
            Instruction::Move { node, neighbor } => {
                let mutual =
                    graph.vertex(neighbor).is_some() && self.sent.get(&neighbor) == Some(&node);
                if mutual {
                    if neighbor < node {
                        graph.insert_match(neighbor, node);
                    }
                    graph.remove_vertex_except(neighbor, Some(node), outbox);
                } else {
                    debug!(
                        pid = graph.pid(),
                        src, node, neighbor, "one-sided proposal expired"
                    );
                }
            }
            other => {
                warn!(
                    pid = graph.pid(),
                    src,
                    tag = other.tag(),
                    "instruction outside the completion protocol"
                );
            }
        }
        Ok(())
    }
}
