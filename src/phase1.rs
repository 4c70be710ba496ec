//! Phase I: singleton elimination.
//!
//! A vertex of degree 1 has exactly one way into the matching, so taking
//! that edge greedily is always safe. The sweep repeats locally until no
//! singleton remains, because every match and removal can expose new
//! singletons; removals that cross a partition boundary travel as `DELETE`,
//! and a singleton whose sole neighbor lives elsewhere travels as `MOVE`.
//!
//! A `MOVE` is a non-binding claim: the sender erases its vertex on the spot
//! and the receiver either honors the claim (neighbor still present) or
//! drops it (neighbor already consumed by another match). The one symmetric
//! case — two degree-1 vertices across a boundary proposing to each other in
//! the same round — is detected from the sender's own proposal memory and
//! matched; the owner of the smaller endpoint records the pair so it lands
//! in exactly one matching list.
//!
//! Both matching and removal strictly shrink vertices + edges, so the phase
//! always reaches quiescence.

use crate::graph::{LocalGraph, Lookup};
use crate::instruction::Instruction;
use crate::nid::Nid;
use crate::outbox::Outbox;
use crate::rounds::RoundStep;
use anyhow::Result;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Round driver for Phase I.
#[derive(Default)]
pub struct SingletonElimination {
    /// MOVE proposals sent in the current round: proposer → target. Used to
    /// recognize the symmetric-claim case when the target's proposal arrives.
    sent_moves: HashMap<Nid, Nid>,
}

impl SingletonElimination {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_singleton(graph: &LocalGraph) -> Option<(Nid, Nid)> {
        graph
            .vertices()
            .iter()
            .find(|v| v.degree() == 1)
            .map(|v| (v.id, v.neighbors[0]))
    }
}

impl RoundStep for SingletonElimination {
    fn local(&mut self, graph: &mut LocalGraph, outbox: &mut Outbox) -> Result<()> {
        self.sent_moves.clear();
        while let Some((v, w)) = Self::find_singleton(graph) {
            let owner = graph.owner_of(w);
            if owner == graph.pid() {
                // Both ends local: match, then cascade w's other edges away.
                graph.insert_match(v, w);
                graph.remove_vertex(w, outbox);
                graph.remove_vertex(v, outbox);
            } else {
                // The sole edge is now expressed in the outgoing MOVE; no
                // DELETE toward w is needed.
                outbox.add(owner, Instruction::Move {
                    node: v,
                    neighbor: w,
                });
                self.sent_moves.insert(v, w);
                graph.remove_vertex_except(v, Some(w), outbox);
            }
        }
        graph.remove_empty_vertices();
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
            Instruction::Move { node, neighbor } => match graph.lookup(neighbor) {
                Lookup::Found(_) => {
                    graph.insert_match(node, neighbor);
                    graph.remove_vertex_except(neighbor, Some(node), outbox);
                }
                Lookup::AbsentLocal => {
                    // Symmetric claims on the same cross-partition edge match
                    // anyway; the smaller endpoint's owner records the pair.
                    let mutual = self.sent_moves.get(&neighbor) == Some(&node);
                    if mutual && neighbor < node {
                        graph.insert_match(neighbor, node);
                    } else if !mutual {
                        debug!(
                            pid = graph.pid(),
                            src, node, neighbor, "MOVE target already consumed; claim dropped"
                        );
                    }
                }
                Lookup::Remote => {
                    warn!(
                        pid = graph.pid(),
                        src, node, neighbor, "MOVE for a vertex owned elsewhere"
                    );
                }
            },
            other => {
                warn!(
                    pid = graph.pid(),
                    src,
                    tag = other.tag(),
                    "instruction outside the singleton-elimination protocol"
                );
            }
        }
        Ok(())
    }
}
