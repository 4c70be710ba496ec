//! Phase II extraction: turning finished snakes into matches.
//!
//! Once formation quiesces, every snake is a simple path of segments. The
//! segment holding a snake's global tail pairs its body from the tail end —
//! `(b0,b1) (b2,b3) …` — recording each pair and removing the matched
//! vertices (removals cascade `DELETE`s exactly as in Phase I). At a segment
//! boundary the remainder decides the signal to the downstream segment:
//!
//! - odd remainder: the leftover head proposes across the boundary with
//!   `MOVE(leftover, w)`; the receiver records the boundary pair and keeps
//!   pairing after `w`;
//! - even remainder: `REVERSE(base, w)` re-roots the downstream rest of the
//!   chain at `w`, which then pairs itself as a fresh tail.
//!
//! The ripple visits every segment of a chain exactly once (snakes have no
//! cycles), so at most one vertex per snake — its final global head — is
//! left unmatched. Segments that never get a signal (a chain broken by a
//! stale grant during formation) simply keep their vertices, and the
//! completion sweep takes those.

use crate::graph::LocalGraph;
use crate::instruction::Instruction;
use crate::nid::Nid;
use crate::outbox::Outbox;
use crate::rounds::RoundStep;
use crate::snake::SnakePen;
use anyhow::Result;
use tracing::{debug, warn};

/// Round driver for the extraction loop.
pub struct Extraction {
    pen: SnakePen,
    done: Vec<bool>,
    started: bool,
}

impl Extraction {
    pub(crate) fn new(pen: SnakePen) -> Self {
        let slots = pen.n_slots();
        Self {
            pen,
            done: vec![false; slots],
            started: false,
        }
    }

    /// Pair one segment's body starting at `start`, then signal downstream.
    fn pair_segment(
        &mut self,
        slot: usize,
        start: usize,
        graph: &mut LocalGraph,
        outbox: &mut Outbox,
    ) {
        self.done[slot] = true;
        let seg = self.pen.get(slot).expect("pairing a live segment");
        let body = seg.body.clone();
        let (base, next) = (seg.base, seg.next);

        let mut i = start;
        while i + 1 < body.len() {
            let (a, b) = (body[i], body[i + 1]);
            graph.insert_match(a, b);
            graph.remove_vertex(a, outbox);
            graph.remove_vertex(b, outbox);
            i += 2;
        }

        if i < body.len() {
            // Odd remainder: hand the leftover across the boundary. On a
            // valid run the boundary vertex is still unpaired, so the claim
            // always lands; the leftover's edges are expressed by the MOVE
            // plus the removal cascade.
            if let Some(w) = next {
                let leftover = body[i];
                outbox.add(graph.owner_of(w), Instruction::Move {
                    node: leftover,
                    neighbor: w,
                });
                graph.remove_vertex_except(leftover, Some(w), outbox);
            }
            // No downstream link: the snake's global head stays unmatched.
        } else if let Some(w) = next {
            outbox.add(graph.owner_of(w), Instruction::Reverse { base, new_tail: w });
        }
    }

    /// Locate the segment a boundary signal addresses: live, not yet paired,
    /// and starting at exactly the named vertex.
    fn signalled_slot(&self, graph: &LocalGraph, v: Nid) -> Option<usize> {
        let slot = self.pen.slot_of(v)?;
        let seg = self.pen.get(slot)?;
        if self.done[slot] || seg.tail() != v || graph.vertex(v).is_none() {
            return None;
        }
        Some(slot)
    }
}

impl RoundStep for Extraction {
    fn local(&mut self, graph: &mut LocalGraph, outbox: &mut Outbox) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        for slot in 0..self.pen.n_slots() {
            if self.pen.get(slot).is_some_and(|s| s.is_true_tail()) {
                self.pair_segment(slot, 0, graph, outbox);
            }
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
            Instruction::Move { node, neighbor } => match self.signalled_slot(graph, neighbor) {
                Some(slot) => {
                    graph.insert_match(node, neighbor);
                    graph.remove_vertex_except(neighbor, Some(node), outbox);
                    self.pair_segment(slot, 1, graph, outbox);
                }
                None => {
                    warn!(
                        pid = graph.pid(),
                        src, node, neighbor, "boundary MOVE with no matching segment"
                    );
                }
            },
            Instruction::Reverse { base, new_tail } => match self.signalled_slot(graph, new_tail) {
                Some(slot) => {
                    debug!(pid = graph.pid(), base, new_tail, "chain re-rooted");
                    let seg = self.pen.get_mut(slot).expect("signalled segment is live");
                    seg.prev = None;
                    seg.base = new_tail;
                    self.pair_segment(slot, 0, graph, outbox);
                }
                None => {
                    warn!(
                        pid = graph.pid(),
                        src, base, new_tail, "re-root with no matching segment"
                    );
                }
            },
            other => {
                warn!(
                    pid = graph.pid(),
                    src,
                    tag = other.tag(),
                    "instruction outside the extraction protocol"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::Partition;
    use crate::snake::SnakeFormation;

    /// Form the local chains for a pid-0 slice and hand over the pen.
    fn form(graph: &mut LocalGraph, outbox: &mut Outbox) -> SnakeFormation {
        let mut formation = SnakeFormation::new();
        formation.local(graph, outbox).unwrap();
        formation
    }

    #[test]
    fn a_local_chain_pairs_from_the_tail() {
        let mut graph = LocalGraph::load(3, 0, 1, Partition::Block, &[(0, 1), (1, 2)]);
        let mut outbox = Outbox::new(1);
        let formation = form(&mut graph, &mut outbox);
        assert!(outbox.is_empty());

        let mut extraction = Extraction::new(formation.into_pen());
        extraction.local(&mut graph, &mut outbox).unwrap();

        assert_eq!(graph.matching(), &[(0, 1)]);
        assert!(graph.vertex(2).is_some(), "the odd head stays unmatched");
        assert_eq!(graph.len(), 1);
        assert!(outbox.is_empty(), "a fully local chain sends nothing");
    }

    #[test]
    fn odd_boundary_hands_the_leftover_across() {
        // Chain [0, 2, 4] whose head was granted a link to remote vertex 1.
        let mut graph = LocalGraph::load(6, 0, 2, Partition::Cyclic, &[(0, 2), (2, 4), (4, 1)]);
        let mut outbox = Outbox::new(2);
        let mut formation = form(&mut graph, &mut outbox);
        outbox.drain();
        formation
            .apply(
                1,
                Instruction::Concatenate {
                    hunter_base: 0,
                    hunter_head: 4,
                    target: 1,
                },
                &mut graph,
                &mut outbox,
            )
            .unwrap();

        let mut extraction = Extraction::new(formation.into_pen());
        extraction.local(&mut graph, &mut outbox).unwrap();

        assert_eq!(graph.matching(), &[(0, 2)]);
        assert!(graph.is_empty(), "the leftover leaves with the MOVE");
        assert!(outbox.drain()[1].contains(&Instruction::Move {
            node: 4,
            neighbor: 1
        }));
    }

    /// A downstream segment [1, 3, 5] whose tail was absorbed by a remote
    /// hunter at vertex 0.
    fn downstream() -> (LocalGraph, Extraction, Outbox) {
        let mut graph = LocalGraph::load(6, 1, 2, Partition::Cyclic, &[(1, 3), (3, 5), (0, 1)]);
        let mut outbox = Outbox::new(2);
        let mut formation = form(&mut graph, &mut outbox);
        formation
            .apply(
                0,
                Instruction::Concatenate {
                    hunter_base: 0,
                    hunter_head: 0,
                    target: 1,
                },
                &mut graph,
                &mut outbox,
            )
            .unwrap();
        outbox.drain();

        let mut extraction = Extraction::new(formation.into_pen());
        extraction.local(&mut graph, &mut outbox).unwrap();
        assert!(graph.matching().is_empty(), "a linked tail waits for its signal");
        (graph, extraction, outbox)
    }

    #[test]
    fn boundary_move_matches_and_continues_pairing() {
        let (mut graph, mut extraction, mut outbox) = downstream();
        extraction
            .apply(
                0,
                Instruction::Move {
                    node: 0,
                    neighbor: 1,
                },
                &mut graph,
                &mut outbox,
            )
            .unwrap();
        assert_eq!(graph.matching(), &[(0, 1), (3, 5)]);
        assert!(graph.is_empty());
    }

    #[test]
    fn reroot_pairs_the_remainder_as_a_fresh_tail() {
        let (mut graph, mut extraction, mut outbox) = downstream();
        extraction
            .apply(
                0,
                Instruction::Reverse {
                    base: 0,
                    new_tail: 1,
                },
                &mut graph,
                &mut outbox,
            )
            .unwrap();
        assert_eq!(graph.matching(), &[(1, 3)]);
        assert!(graph.vertex(5).is_some(), "the new odd head stays");
        assert_eq!(graph.len(), 1);
    }
}
