//! The generic BSP round loop shared by every phase driver.
//!
//! One round is: local mutation → exchange → interpret received mail. The
//! loop terminates when a full round moves zero records globally — and since
//! every process computes the same `total`, they all leave the loop at the
//! same round, keeping the barrier schedule aligned.
//!
//! Phase drivers plug in through [`RoundStep`]: `local` performs this round's
//! mutations and queues outgoing instructions, `apply` interprets one
//! received instruction (and may queue follow-ups for the next round). Mail
//! is applied in ascending tag order — a stable sort, so the grouping by
//! source process survives within each tag. `KEEP_ALIVE` records count
//! toward the round total but are never handed to `apply`.

use crate::bsp::Bsp;
use crate::exchange::exchange_round;
use crate::graph::LocalGraph;
use crate::instruction::Instruction;
use crate::outbox::Outbox;
use anyhow::Result;

/// One phase's behavior inside the round loop.
pub trait RoundStep {
    /// Perform this round's local mutations, queueing outgoing instructions.
    fn local(&mut self, graph: &mut LocalGraph, outbox: &mut Outbox) -> Result<()>;

    /// Apply one received instruction; may queue follow-ups for next round.
    fn apply(
        &mut self,
        src: usize,
        ins: Instruction,
        graph: &mut LocalGraph,
        outbox: &mut Outbox,
    ) -> Result<()>;
}

/// What a finished loop did, for the stats report.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoopReport {
    /// Rounds executed, including the final quiescent one.
    pub rounds: usize,
    /// Instruction records received over the whole loop (KEEP_ALIVE included).
    pub received: usize,
}

/// Drive `step` until global quiescence.
pub fn drive(bsp: &Bsp, graph: &mut LocalGraph, step: &mut dyn RoundStep) -> Result<LoopReport> {
    let mut outbox = Outbox::new(bsp.n_procs());
    let mut report = LoopReport::default();
    loop {
        report.rounds += 1;
        step.local(graph, &mut outbox)?;
        let mut mail = exchange_round(bsp, &mut outbox)?;
        if mail.total == 0 {
            return Ok(report);
        }
        report.received += mail.total;
        mail.instructions.sort_by_key(|(_, ins)| ins.tag());
        for (src, ins) in mail.instructions {
            if matches!(ins, Instruction::KeepAlive) {
                continue;
            }
            step.apply(src, ins, graph, &mut outbox)?;
        }
    }
}
