//! All-to-all instruction exchange over the substrate.
//!
//! One round of exchange is three put/barrier phases:
//!
//! 1. **Counts** — every process tells every peer how many instructions it is
//!    about to send.
//! 2. **Offsets** — every process lays out its incoming buffer (prefix sums
//!    of the counts it will receive) and tells each sender where that
//!    sender's block starts.
//! 3. **Payload** — every process registers a receive buffer of
//!    `sum(expected)` fixed-width records and puts its queued instructions
//!    into each destination's pre-agreed slot.
//!
//! Because offsets are agreed up front, no two senders ever touch the same
//! words of a receive buffer. After the final barrier the buffer is stable;
//! decoding yields the mail grouped by source process. The round's
//! `total` is the sum of expected records — when every process sees zero,
//! the round loop is globally quiescent and terminates.

use crate::bsp::Bsp;
use crate::instruction::{Instruction, WIRE_WORDS, Wire};
use crate::outbox::Outbox;
use anyhow::Result;
use tracing::warn;

/// One received round of instructions, grouped by source process (ascending),
/// plus the raw record count that drives the quiescence test.
#[derive(Debug)]
pub struct RoundMail {
    pub instructions: Vec<(usize, Instruction)>,
    pub total: usize,
}

/// The BSPlib-style all-to-all of one word per peer: sends `values[q]` to
/// process `q`, returns the word each peer sent here (indexed by sender).
pub fn exchange_words(bsp: &Bsp, values: &[u32]) -> Result<Vec<u32>> {
    let n = bsp.n_procs();
    debug_assert_eq!(values.len(), n);
    bsp.register(n)?;
    bsp.barrier()?;
    for (q, &value) in values.iter().enumerate() {
        bsp.put(q, bsp.pid(), &[value])?;
    }
    bsp.barrier()?;
    bsp.unregister()
}

/// Drain the outbox through one full count/offset/payload exchange.
///
/// Calls [`Outbox::finalize_liveness`] first, so a process with anything to
/// say keeps every peer inside the round loop.
pub fn exchange_round(bsp: &Bsp, outbox: &mut Outbox) -> Result<RoundMail> {
    let n = bsp.n_procs();
    outbox.finalize_liveness();

    // Phase 1: counts.
    let counts = outbox.counts();
    let expected = exchange_words(bsp, &counts)?;

    // Phase 2: offsets. `offsets[q]` is where q's block starts in my buffer;
    // the exchange hands each sender its slot in every receiver.
    let mut offsets = vec![0u32; n];
    let mut total = 0u32;
    for (q, &count) in expected.iter().enumerate() {
        offsets[q] = total;
        total += count;
    }
    let send_offsets = exchange_words(bsp, &offsets)?;

    // Phase 3: payload.
    bsp.register(total as usize * WIRE_WORDS)?;
    bsp.barrier()?;
    for (q, queue) in outbox.drain().into_iter().enumerate() {
        let base = send_offsets[q] as usize;
        for (j, ins) in queue.iter().enumerate() {
            bsp.put(q, (base + j) * WIRE_WORDS, &ins.encode())?;
        }
    }
    bsp.barrier()?;
    let buf = bsp.unregister()?;

    let mut instructions = Vec::with_capacity(total as usize);
    for (src, &count) in expected.iter().enumerate() {
        let base = offsets[src] as usize;
        for j in 0..count as usize {
            let at = (base + j) * WIRE_WORDS;
            let mut wire: Wire = [0; WIRE_WORDS];
            wire.copy_from_slice(&buf[at..at + WIRE_WORDS]);
            match Instruction::decode(&wire) {
                Ok(ins) => instructions.push((src, ins)),
                Err(tag) => {
                    warn!(pid = bsp.pid(), src, tag, "unknown instruction tag dropped");
                }
            }
        }
    }

    Ok(RoundMail {
        instructions,
        total: total as usize,
    })
}
