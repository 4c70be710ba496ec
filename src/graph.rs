//! The per-process slice of the global graph.
//!
//! A [`LocalGraph`] owns the vertices assigned to this process by the
//! partition function, their adjacency as seen locally, and the pairs this
//! process has recorded into the global matching. Vertices live in an arena
//! (`Vec`) with an id→slot index on the side; adjacency lists hold vertex
//! ids, never slots, so nothing that leaves this process can dangle.
//!
//! Removal discipline: deleting a vertex erases it everywhere in the local
//! store (arena, index, and the back-edges of local neighbors) and enqueues a
//! `DELETE` toward the owner of every remote neighbor. Swap-remove keeps the
//! arena dense; neighbor order is only loosely preserved, which nothing here
//! depends on.

use crate::instruction::Instruction;
use crate::nid::Nid;
use crate::outbox::Outbox;
use crate::partition::Partition;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Outcome of resolving a vertex id against the local store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// Present, at this arena slot.
    Found(usize),
    /// This process owns the id but the vertex is gone (already deleted).
    AbsentLocal,
    /// Another process owns the id.
    Remote,
}

/// A vertex and its locally-known adjacency.
///
/// Snake membership is not stored here: the snake engine keeps its own
/// vertex→segment index, so there is a single source of truth for "bound
/// into some snake".
#[derive(Clone, Debug)]
pub struct Vertex {
    pub id: Nid,
    pub neighbors: Vec<Nid>,
}

impl Vertex {
    fn new(id: Nid) -> Self {
        Self {
            id,
            neighbors: Vec::new(),
        }
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }
}

/// The local graph `G_p`: vertex arena, matching list, and run parameters.
#[derive(Debug)]
pub struct LocalGraph {
    vertices: Vec<Vertex>,
    slots: HashMap<Nid, usize>,
    matching: Vec<(Nid, Nid)>,
    n_global: Nid,
    pid: usize,
    n_procs: usize,
    partition: Partition,
}

impl LocalGraph {
    pub fn new(n_global: Nid, pid: usize, n_procs: usize, partition: Partition) -> Self {
        Self {
            vertices: Vec::new(),
            slots: HashMap::new(),
            matching: Vec::new(),
            n_global,
            pid,
            n_procs,
            partition,
        }
    }

    /// Build the store from the locally-relevant edge list: every edge with
    /// at least one endpoint owned here. Duplicate edges collapse.
    ///
    /// Isolated vertices of the input never appear; by definition they do
    /// not match.
    pub fn load(
        n_global: Nid,
        pid: usize,
        n_procs: usize,
        partition: Partition,
        edges: &[(Nid, Nid)],
    ) -> Self {
        let mut g = Self::new(n_global, pid, n_procs, partition);
        for &(u, v) in edges {
            if g.owner_of(u) == pid {
                g.connect(u, v);
            }
            if g.owner_of(v) == pid {
                g.connect(v, u);
            }
        }
        g
    }

    fn connect(&mut self, local: Nid, other: Nid) {
        let slot = match self.slots.get(&local) {
            Some(&s) => s,
            None => {
                let s = self.vertices.len();
                self.vertices.push(Vertex::new(local));
                self.slots.insert(local, s);
                s
            }
        };
        let vertex = &mut self.vertices[slot];
        if !vertex.neighbors.contains(&other) {
            vertex.neighbors.push(other);
        }
    }

    pub fn pid(&self) -> usize {
        self.pid
    }

    pub fn n_procs(&self) -> usize {
        self.n_procs
    }

    pub fn n_global(&self) -> Nid {
        self.n_global
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// The process that owns vertex id `v`.
    pub fn owner_of(&self, v: Nid) -> usize {
        self.partition.owner(v, self.n_global, self.n_procs)
    }

    /// Resolve `v` against the local store.
    pub fn lookup(&self, v: Nid) -> Lookup {
        if self.owner_of(v) != self.pid {
            return Lookup::Remote;
        }
        match self.slots.get(&v) {
            Some(&slot) => Lookup::Found(slot),
            None => Lookup::AbsentLocal,
        }
    }

    pub fn vertex(&self, v: Nid) -> Option<&Vertex> {
        self.slots.get(&v).map(|&s| &self.vertices[s])
    }

    /// Arena-order view of the live vertices. Arena order is deterministic:
    /// insertion order perturbed only by swap-removes, which are themselves
    /// deterministic.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Remove the edge `u -> w` from `u`'s adjacency. `w` must currently be a
    /// neighbor of `u`.
    pub fn remove_edge(&mut self, u: Nid, w: Nid) {
        let slot = self.slots[&u];
        let neighbors = &mut self.vertices[slot].neighbors;
        let pos = neighbors
            .iter()
            .position(|&n| n == w)
            .expect("remove_edge: not a neighbor");
        neighbors.swap_remove(pos);
    }

    /// Erase `v`: drop local back-edges and enqueue `DELETE` toward the owner
    /// of every remote neighbor.
    pub fn remove_vertex(&mut self, v: Nid, outbox: &mut Outbox) {
        self.remove_vertex_except(v, None, outbox);
    }

    /// Like [`remove_vertex`](Self::remove_vertex), but suppresses the
    /// notification toward `except`: used when a `MOVE` or a recorded match
    /// already expresses that edge's fate on the peer side.
    pub fn remove_vertex_except(&mut self, v: Nid, except: Option<Nid>, outbox: &mut Outbox) {
        let slot = match self.slots.remove(&v) {
            Some(s) => s,
            None => return,
        };
        let vertex = self.vertices.swap_remove(slot);
        if let Some(moved) = self.vertices.get(slot) {
            self.slots.insert(moved.id, slot);
        }
        for w in vertex.neighbors {
            if Some(w) == except {
                continue;
            }
            let owner = self.owner_of(w);
            if owner == self.pid {
                // I2: a local neighbor is present unless it was erased in the
                // same cascade, in which case its back-edge went with it.
                if self.slots.contains_key(&w) {
                    self.remove_edge(w, v);
                }
            } else {
                outbox.add(owner, Instruction::Delete {
                    node: v,
                    neighbor: w,
                });
            }
        }
    }

    /// Sweep every vertex whose degree reached 0. No instructions are needed;
    /// nothing references such a vertex any more.
    pub fn remove_empty_vertices(&mut self) {
        let mut slot = 0;
        while slot < self.vertices.len() {
            if self.vertices[slot].neighbors.is_empty() {
                let gone = self.vertices.swap_remove(slot);
                self.slots.remove(&gone.id);
                if let Some(moved) = self.vertices.get(slot) {
                    self.slots.insert(moved.id, slot);
                }
            } else {
                slot += 1;
            }
        }
    }

    /// Apply a received `DELETE(node, neighbor)`: the remote `node` was
    /// removed, so drop it from the local `neighbor`'s adjacency.
    ///
    /// A `neighbor` that vanished in the same round window is a benign race;
    /// anything structurally impossible is a protocol violation and is
    /// logged as such. Either way the instruction is dropped.
    pub fn apply_remote_delete(&mut self, src: usize, node: Nid, neighbor: Nid) {
        match self.lookup(neighbor) {
            Lookup::Found(_) => {
                let has_edge = self
                    .vertex(neighbor)
                    .is_some_and(|v| v.neighbors.contains(&node));
                if has_edge {
                    self.remove_edge(neighbor, node);
                } else {
                    warn!(
                        pid = self.pid,
                        src, node, neighbor, "DELETE for an edge this process does not hold"
                    );
                }
            }
            Lookup::AbsentLocal => {
                debug!(pid = self.pid, src, node, neighbor, "late DELETE dropped");
            }
            Lookup::Remote => {
                warn!(
                    pid = self.pid,
                    src, node, neighbor, "DELETE for a vertex owned elsewhere"
                );
            }
        }
    }

    /// Record the pair `{a, b}`. Exactly one process records any given pair:
    /// the process applying the operation that decided it.
    pub fn insert_match(&mut self, a: Nid, b: Nid) {
        self.matching.push((a, b));
    }

    pub fn matching(&self) -> &[(Nid, Nid)] {
        &self.matching
    }

    pub fn take_matching(self) -> Vec<(Nid, Nid)> {
        self.matching
    }
}
