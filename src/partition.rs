//! Vertex ownership: mapping a vertex id to the process that holds it.
//!
//! Every process computes ownership with the same pure function; it is never
//! broadcast. Two strategies are supported and both must be used consistently
//! for the lifetime of a run — mixing them mid-run would shred invariant I1.

use crate::nid::Nid;
use serde::{Deserialize, Serialize};

/// How vertex ids are distributed over processes.
///
/// With 9 vertices on 3 processes (A, B, C):
///
/// ```text
///   block:   0 1 2 | 3 4 5 | 6 7 8        cyclic:  0 3 6 | 1 4 7 | 2 5 8
///              A       B       C                      A       B       C
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// Contiguous ranges: `owner(v) = v * P / n_global`.
    Block,
    /// Round-robin: `owner(v) = v mod P`.
    Cyclic,
}

impl Partition {
    /// The process that owns vertex `v`.
    ///
    /// Total for all `v < n_global`; the result is always in `0..n_procs`.
    pub fn owner(self, v: Nid, n_global: Nid, n_procs: usize) -> usize {
        debug_assert!(n_procs > 0);
        match self {
            Partition::Block => {
                debug_assert!(v < n_global);
                (v as u64 * n_procs as u64 / n_global as u64) as usize
            }
            Partition::Cyclic => v as usize % n_procs,
        }
    }
}
