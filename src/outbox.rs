//! The todo list: per-destination queues of outgoing instructions.
//!
//! Instructions accumulate here during a round's local step and are drained
//! by the exchange layer. Two small rules carry a lot of weight:
//!
//! - **Soft-dedup.** Appending an instruction identical to the one already at
//!   the back of the same queue is a no-op. Several local vertices often
//!   imply the same remote deletion in one sweep; one copy is enough.
//! - **Liveness fill.** Just before the exchange, if *any* queue holds an
//!   instruction then every *empty* queue receives a single `KEEP_ALIVE`.
//!   A receiver that saw zero incoming records would conclude the whole run
//!   is quiescent and leave the round loop while its peers are still
//!   working; the filler keeps it listening.

use crate::instruction::Instruction;

/// Ordered outgoing instructions, one queue per destination process.
#[derive(Debug)]
pub struct Outbox {
    queues: Vec<Vec<Instruction>>,
}

impl Outbox {
    pub fn new(n_procs: usize) -> Self {
        Self {
            queues: vec![Vec::new(); n_procs],
        }
    }

    pub fn n_procs(&self) -> usize {
        self.queues.len()
    }

    /// Append `ins` for destination `dest`, collapsing an immediate repeat.
    pub fn add(&mut self, dest: usize, ins: Instruction) {
        let q = &mut self.queues[dest];
        if q.last() == Some(&ins) {
            return;
        }
        q.push(ins);
    }

    /// Append an independent copy of `ins` to every destination queue.
    pub fn add_broadcast(&mut self, ins: Instruction) {
        for dest in 0..self.queues.len() {
            self.add(dest, ins);
        }
    }

    /// True if no queue holds anything.
    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(Vec::is_empty)
    }

    /// Fill empty queues with `KEEP_ALIVE` iff any queue is non-empty.
    pub fn finalize_liveness(&mut self) {
        if self.is_empty() {
            return;
        }
        for q in &mut self.queues {
            if q.is_empty() {
                q.push(Instruction::KeepAlive);
            }
        }
    }

    /// Number of queued instructions per destination.
    pub fn counts(&self) -> Vec<u32> {
        self.queues.iter().map(|q| q.len() as u32).collect()
    }

    /// Drain all queues, leaving the outbox empty for the next round.
    pub fn drain(&mut self) -> Vec<Vec<Instruction>> {
        let n = self.queues.len();
        std::mem::replace(&mut self.queues, vec![Vec::new(); n])
    }
}
