//! Phase II formation: snakes and the cross-partition merge protocol.
//!
//! After singleton elimination no vertex has degree 1. Every survivor spawns
//! as a single-vertex snake (a *snek*), and from then on all growth is
//! merging: a snake's head bites the tail of another snake and absorbs it.
//! A snake that spans processes is a chain of per-process [`Segment`]s
//! linked by remote vertex ids (`next`/`prev`); the segment holding the
//! global tail has `prev == None` and `body[0] == base`.
//!
//! Cross-partition surgery runs on three sub-forms of `CONCATENATE` (see the
//! instruction docs): a **bid** from a hunter's head at a remote vertex, a
//! **rebase** cascade that rewrites the absorbed snake's base along its
//! chain, and a **grant** flowing back to the hunter so it can link its
//! `next`. A bid landing on a snake's *head* flips that snake's orientation
//! when it is confined to a single segment; a bid by a snek landing on a
//! *belly* vertex splices the snek into the host's body (`INHERIT` to the
//! snek's owner).
//!
//! Arbitration is strict base ordering: a bid is accepted only at the prey's
//! true tail and only when the hunter's base is smaller than the prey's.
//! Bases only ever decrease through merges, and a snake's tail segment holds
//! its true base by definition, so a hunter's claimed base is never below
//! its true one — which makes a self-bite (`hunter == prey`) fail the strict
//! comparison and rules out merge cycles entirely. Rejection is silence: the
//! hunter re-bids elsewhere after a two-round window and eventually goes
//! dormant; whatever greed leaves unmatched, the completion sweep finishes.

use crate::graph::{LocalGraph, Lookup};
use crate::instruction::Instruction;
use crate::nid::{NIL, Nid};
use crate::outbox::Outbox;
use crate::rounds::RoundStep;
use anyhow::Result;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug)]
struct PendingBid {
    target: Nid,
    /// Round after which an unanswered bid counts as rejected.
    expires: u64,
}

/// One process's run of a (possibly multi-process) snake.
#[derive(Debug)]
pub(crate) struct Segment {
    /// Global snake id: the id of the snake's tail vertex. Kept current by
    /// the rebase cascade; authoritative only on the tail segment itself.
    pub(crate) base: Nid,
    /// Local vertices, tail→head order. Never empty.
    pub(crate) body: Vec<Nid>,
    /// Remote vertex our head links to, once a bid has been granted.
    pub(crate) next: Option<Nid>,
    /// Remote vertex whose snake absorbed our tail.
    pub(crate) prev: Option<Nid>,

    attempts: BTreeSet<Nid>,
    pending: Option<PendingBid>,
    pass: u8,
    dormant: bool,
}

impl Segment {
    fn snek(v: Nid) -> Self {
        Self {
            base: v,
            body: vec![v],
            next: None,
            prev: None,
            attempts: BTreeSet::new(),
            pending: None,
            pass: 0,
            dormant: false,
        }
    }

    pub(crate) fn head(&self) -> Nid {
        *self.body.last().expect("segment body is never empty")
    }

    pub(crate) fn tail(&self) -> Nid {
        self.body[0]
    }

    /// Holds the global head of its snake, i.e. the hunting end.
    fn is_hunting_end(&self) -> bool {
        self.next.is_none()
    }

    /// Holds the global tail of its snake.
    pub(crate) fn is_true_tail(&self) -> bool {
        self.prev.is_none()
    }

    /// Structural change: hunting state restarts from scratch.
    fn reset_hunt(&mut self) {
        self.attempts.clear();
        self.pending = None;
        self.pass = 0;
        self.dormant = false;
    }
}

/// Arena of snake segments with a vertex→segment index. Dead slots stay as
/// tombstones so slot numbers are stable; iteration in slot order is
/// deterministic (creation order).
#[derive(Debug, Default)]
pub(crate) struct SnakePen {
    segments: Vec<Option<Segment>>,
    by_vertex: HashMap<Nid, usize>,
}

impl SnakePen {
    pub(crate) fn slot_of(&self, v: Nid) -> Option<usize> {
        self.by_vertex.get(&v).copied()
    }

    pub(crate) fn get(&self, slot: usize) -> Option<&Segment> {
        self.segments.get(slot).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, slot: usize) -> Option<&mut Segment> {
        self.segments.get_mut(slot).and_then(Option::as_mut)
    }

    pub(crate) fn n_slots(&self) -> usize {
        self.segments.len()
    }

    fn add(&mut self, segment: Segment) -> usize {
        let slot = self.segments.len();
        for &v in &segment.body {
            self.by_vertex.insert(v, slot);
        }
        self.segments.push(Some(segment));
        slot
    }

    fn absorb_body(&mut self, into: usize, body: &[Nid]) {
        for &v in body {
            self.by_vertex.insert(v, into);
        }
    }

    fn kill(&mut self, slot: usize) -> Segment {
        self.segments[slot].take().expect("killing a dead segment")
    }
}

/// Round driver for the formation loop.
#[derive(Default)]
pub struct SnakeFormation {
    pen: SnakePen,
    round: u64,
    spawned: bool,
}

impl SnakeFormation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand the finished chains to the extraction loop.
    pub(crate) fn into_pen(self) -> SnakePen {
        self.pen
    }

    fn spawn(&mut self, graph: &LocalGraph) {
        for v in graph.vertices() {
            self.pen.add(Segment::snek(v.id));
        }
        self.spawned = true;
    }

    /// Sorted local-neighbor view of a vertex; sorted because arena removals
    /// perturb adjacency order and the sweep must be deterministic.
    fn sorted_neighbors(graph: &LocalGraph, v: Nid) -> Vec<Nid> {
        let mut neighbors = graph
            .vertex(v)
            .map(|vx| vx.neighbors.clone())
            .unwrap_or_default();
        neighbors.sort_unstable();
        neighbors
    }

    /// Merge local true tails into local hunting heads until nothing moves.
    fn merge_local(&mut self, graph: &LocalGraph, outbox: &mut Outbox) {
        loop {
            let mut merged = false;
            for slot in 0..self.pen.n_slots() {
                let Some(seg) = self.pen.get(slot) else {
                    continue;
                };
                if !seg.is_hunting_end() || seg.pending.is_some() {
                    continue;
                }
                let (head, base) = (seg.head(), seg.base);
                let prey = Self::sorted_neighbors(graph, head)
                    .into_iter()
                    .filter(|&w| graph.owner_of(w) == graph.pid())
                    .filter_map(|w| self.pen.slot_of(w).map(|s| (w, s)))
                    .find(|&(w, prey_slot)| {
                        prey_slot != slot
                            && self.pen.get(prey_slot).is_some_and(|p| {
                                p.is_true_tail() && p.tail() == w && base < p.base
                            })
                    });
                if let Some((_, prey_slot)) = prey {
                    let prey = self.pen.kill(prey_slot);
                    self.pen.absorb_body(slot, &prey.body);
                    let hunter = self.pen.get_mut(slot).expect("hunter segment is live");
                    hunter.body.extend(prey.body);
                    hunter.next = prey.next;
                    hunter.reset_hunt();
                    // The absorbed chain learns its new base via the cascade.
                    if let Some(link) = prey.next {
                        outbox.add(graph.owner_of(link), Instruction::Concatenate {
                            hunter_base: base,
                            hunter_head: NIL,
                            target: link,
                        });
                    }
                    merged = true;
                    break;
                }
            }
            if !merged {
                return;
            }
        }
    }

    /// Advance every hunting head's remote bid state; returns whether any
    /// bid window is still open (the loop must then be kept alive).
    fn hunt_remote(&mut self, graph: &LocalGraph, outbox: &mut Outbox) -> bool {
        let mut waiting = false;
        for slot in 0..self.pen.n_slots() {
            let Some(seg) = self.pen.get(slot) else {
                continue;
            };
            if !seg.is_hunting_end() || seg.dormant {
                continue;
            }
            if let Some(bid) = self.pen.get(slot).unwrap().pending {
                if self.round < bid.expires {
                    waiting = true;
                    continue;
                }
                // Window lapsed: silence means rejection.
                let seg = self.pen.get_mut(slot).unwrap();
                seg.attempts.insert(bid.target);
                seg.pending = None;
            }

            let seg = self.pen.get(slot).unwrap();
            let head = seg.head();
            let candidate = Self::sorted_neighbors(graph, head)
                .into_iter()
                .filter(|&w| graph.owner_of(w) != graph.pid())
                .find(|w| !seg.attempts.contains(w));
            match candidate {
                Some(target) => {
                    let (base, expires) = (seg.base, self.round + 2);
                    outbox.add(graph.owner_of(target), Instruction::Concatenate {
                        hunter_base: base,
                        hunter_head: head,
                        target,
                    });
                    let seg = self.pen.get_mut(slot).unwrap();
                    seg.pending = Some(PendingBid { target, expires });
                    waiting = true;
                }
                None => {
                    let seg = self.pen.get_mut(slot).unwrap();
                    if seg.pass == 0 {
                        // A reversal elsewhere may have turned an earlier
                        // rejection into a tail; try everything once more.
                        seg.pass = 1;
                        seg.attempts.clear();
                    } else {
                        seg.dormant = true;
                    }
                }
            }
        }
        waiting
    }

    fn apply_bid(
        &mut self,
        src: usize,
        hunter_base: Nid,
        hunter_head: Nid,
        target: Nid,
        graph: &LocalGraph,
        outbox: &mut Outbox,
    ) {
        if graph.lookup(target) == Lookup::AbsentLocal {
            warn!(
                pid = graph.pid(),
                src, target, "bid at a vertex this process no longer holds"
            );
            return;
        }
        let Some(slot) = self.pen.slot_of(target) else {
            warn!(pid = graph.pid(), src, target, "bid at an unsnaked vertex");
            return;
        };
        let seg = self.pen.get(slot).expect("indexed segment is live");

        // Tail bite: absorb the prey snake under the hunter's base. A snek
        // with its own bid in flight is off limits: its bid may be turning
        // into a splice at the host right now, and absorbing it would cross
        // those links. (A longer prey's pending bid lives at its head end and
        // cannot conflict with a bite at its tail.)
        if seg.is_true_tail() && seg.tail() == target {
            let busy_snek = seg.body.len() == 1 && seg.pending.is_some();
            if hunter_base >= seg.base || busy_snek {
                debug!(
                    pid = graph.pid(),
                    hunter_base,
                    prey_base = seg.base,
                    busy_snek,
                    "tail bid rejected"
                );
                return;
            }
            let next = {
                let seg = self.pen.get_mut(slot).unwrap();
                seg.prev = Some(hunter_head);
                seg.base = hunter_base;
                // The prey's head may be mid-bid for the merged snake; that
                // hunt stays valid, only the exhausted-target memory resets.
                let pending = seg.pending;
                seg.reset_hunt();
                seg.pending = pending;
                seg.next
            };
            if let Some(link) = next {
                outbox.add(graph.owner_of(link), Instruction::Concatenate {
                    hunter_base,
                    hunter_head: NIL,
                    target: link,
                });
            }
            outbox.add(graph.owner_of(hunter_head), Instruction::Concatenate {
                hunter_base,
                hunter_head,
                target,
            });
            return;
        }

        // Head bite: wrong orientation. Flip when the whole snake is this
        // one segment and the ordering favors the hunter; the hunter's
        // second pass finds the new tail.
        if seg.head() == target && seg.is_hunting_end() {
            if seg.is_true_tail() && seg.pending.is_none() && hunter_base < seg.base {
                let seg = self.pen.get_mut(slot).unwrap();
                seg.body.reverse();
                seg.base = seg.body[0];
                seg.reset_hunt();
            } else {
                debug!(
                    pid = graph.pid(),
                    target, "head bid left unanswered (multi-segment or busy prey)"
                );
            }
            return;
        }

        // Belly bite by a snek: splice it between `target` and the path
        // successor when the snek is adjacent to both.
        if hunter_base == hunter_head {
            let pos = seg
                .body
                .iter()
                .position(|&v| v == target)
                .expect("indexed vertex is in its segment body");
            let successor = seg.body.get(pos + 1).copied();
            let Some(v2) = successor else {
                debug!(
                    pid = graph.pid(),
                    target, "splice rejected: path successor lives elsewhere"
                );
                return;
            };
            let snek_adjacent = graph
                .vertex(v2)
                .is_some_and(|vx| vx.neighbors.contains(&hunter_head))
                && graph
                    .vertex(target)
                    .is_some_and(|vx| vx.neighbors.contains(&hunter_head));
            if !snek_adjacent {
                debug!(pid = graph.pid(), target, "splice rejected: not adjacent");
                return;
            }
            let seg = self.pen.get_mut(slot).unwrap();
            let upper_body = seg.body.split_off(pos + 1);
            let upper = Segment {
                base: seg.base,
                body: upper_body,
                next: seg.next,
                prev: Some(hunter_head),
                attempts: std::mem::take(&mut seg.attempts),
                pending: seg.pending.take(),
                pass: seg.pass,
                dormant: seg.dormant,
            };
            seg.next = Some(hunter_head);
            self.pen.add(upper);
            outbox.add(graph.owner_of(hunter_head), Instruction::Inherit {
                snek_base: hunter_base,
                snek_head: hunter_head,
                v2,
                v1: target,
            });
            return;
        }

        debug!(
            pid = graph.pid(),
            target, "belly bid by a non-snek dropped"
        );
    }

    fn apply_rebase(&mut self, src: usize, new_base: Nid, target: Nid, graph: &LocalGraph, outbox: &mut Outbox) {
        let Some(slot) = self.pen.slot_of(target) else {
            warn!(pid = graph.pid(), src, target, "rebase for an unknown segment");
            return;
        };
        let seg = self.pen.get_mut(slot).expect("indexed segment is live");
        seg.base = new_base;
        let pending = seg.pending;
        seg.reset_hunt();
        seg.pending = pending;
        if let Some(link) = seg.next {
            outbox.add(graph.owner_of(link), Instruction::Concatenate {
                hunter_base: new_base,
                hunter_head: NIL,
                target: link,
            });
        }
    }

    fn apply_grant(&mut self, src: usize, hunter_head: Nid, target: Nid, graph: &LocalGraph) {
        let slot = self.pen.slot_of(hunter_head);
        let seg = slot.and_then(|s| self.pen.get_mut(s));
        match seg {
            Some(seg) if seg.head() == hunter_head && seg.next.is_none() => {
                seg.next = Some(target);
                seg.pending = None;
            }
            _ => {
                // The segment changed shape since the bid went out; the
                // grantor's link stays dangling and the completion sweep
                // picks up whatever this leaves unmatched.
                debug!(pid = graph.pid(), src, hunter_head, "stale grant dropped");
            }
        }
    }
}

impl RoundStep for SnakeFormation {
    fn local(&mut self, graph: &mut LocalGraph, outbox: &mut Outbox) -> Result<()> {
        self.round += 1;
        if !self.spawned {
            self.spawn(graph);
        }
        self.merge_local(graph, outbox);
        let waiting = self.hunt_remote(graph, outbox);
        if waiting && outbox.is_empty() {
            // Nothing to say, but open bid windows need further rounds.
            outbox.add_broadcast(Instruction::KeepAlive);
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
            Instruction::Concatenate {
                hunter_base,
                hunter_head,
                target,
            } => {
                if hunter_head == NIL {
                    self.apply_rebase(src, hunter_base, target, graph, outbox);
                } else if graph.owner_of(target) == graph.pid() {
                    self.apply_bid(src, hunter_base, hunter_head, target, graph, outbox);
                } else {
                    self.apply_grant(src, hunter_head, target, graph);
                }
            }
            Instruction::Inherit {
                snek_base,
                snek_head,
                v2,
                v1,
            } => {
                let slot = self.pen.slot_of(snek_head);
                let seg = slot.and_then(|s| self.pen.get_mut(s));
                match seg {
                    Some(seg)
                        if seg.body.len() == 1
                            && seg.tail() == snek_head
                            && seg.base == snek_base
                            && seg.next.is_none()
                            && seg.prev.is_none() =>
                    {
                        seg.prev = Some(v1);
                        seg.next = Some(v2);
                        seg.pending = None;
                        seg.dormant = true;
                    }
                    _ => {
                        warn!(
                            pid = graph.pid(),
                            src, snek_head, "INHERIT for something that is not a lone snek"
                        );
                    }
                }
            }
            other => {
                warn!(
                    pid = graph.pid(),
                    src,
                    tag = other.tag(),
                    "instruction outside the formation protocol"
                );
            }
        }
        Ok(())
    }
}
