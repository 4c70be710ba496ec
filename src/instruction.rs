//! The instruction protocol: tagged requests exchanged between processes.
//!
//! An instruction is a directed request from one process to one other
//! process, applied at the start of the receiver's next superstep. Each
//! variant is self-contained — a receiver never has to ask for more context
//! to apply one.
//!
//! On the wire an instruction is a fixed-width record of [`WIRE_WORDS`]
//! words: the tag followed by four payload slots (unused slots carry
//! [`NIL`]). Fixed width is what lets the exchange layer pre-compute disjoint
//! receive offsets from counts alone.
//!
//! Tags are numbered in **evaluation order**: within one round of received
//! mail, lower tags are applied first. The ordering puts restructurings
//! (INHERIT, REVERSE) ahead of merges (CONCATENATE) so a concurrent merge
//! never races an in-progress re-orientation.

use crate::nid::{NIL, Nid};

/// Number of `u32` words in one wire record.
pub const WIRE_WORDS: usize = 5;

/// A single wire record.
pub type Wire = [u32; WIRE_WORDS];

/// Tag values, in ascending evaluation order.
pub mod tag {
    pub const KEEP_ALIVE: u32 = 0;
    pub const DELETE: u32 = 1;
    pub const MOVE: u32 = 2;
    pub const INHERIT: u32 = 3;
    pub const REVERSE: u32 = 4;
    pub const CONCATENATE: u32 = 5;
}

/// A request to another process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// No effect; signals "I am not finished, listen again next round".
    KeepAlive,
    /// `node` was removed remotely; remove it from `neighbor`'s adjacency.
    Delete { node: Nid, neighbor: Nid },
    /// `node` (remote) proposes matching with `neighbor` (local to the
    /// receiver).
    Move { node: Nid, neighbor: Nid },
    /// Splice the snek between the host snake's adjacent vertices `v1` and
    /// `v2`: the snek links `prev = v1`, `next = v2`.
    Inherit {
        snek_base: Nid,
        snek_head: Nid,
        v2: Nid,
        v1: Nid,
    },
    /// Re-root the named snake so `new_tail` becomes its base.
    Reverse { base: Nid, new_tail: Nid },
    /// Snake surgery around the `target` vertex. Three receiver-distinguished
    /// forms share this tag: a bid (hunter asks to absorb the snake whose
    /// tail is `target`), a rebase cascade (`hunter_head == NIL`), and a
    /// grant flowing back to the hunter (`target` not owned by the
    /// receiver). See the snake engine for the dispatch.
    Concatenate {
        hunter_base: Nid,
        hunter_head: Nid,
        target: Nid,
    },
}

impl Instruction {
    /// Numeric tag; doubles as the stable sort key for evaluation order.
    pub fn tag(&self) -> u32 {
        match self {
            Instruction::KeepAlive => tag::KEEP_ALIVE,
            Instruction::Delete { .. } => tag::DELETE,
            Instruction::Move { .. } => tag::MOVE,
            Instruction::Inherit { .. } => tag::INHERIT,
            Instruction::Reverse { .. } => tag::REVERSE,
            Instruction::Concatenate { .. } => tag::CONCATENATE,
        }
    }

    /// Encode into one fixed-width wire record.
    pub fn encode(&self) -> Wire {
        match *self {
            Instruction::KeepAlive => [tag::KEEP_ALIVE, NIL, NIL, NIL, NIL],
            Instruction::Delete { node, neighbor } => [tag::DELETE, node, neighbor, NIL, NIL],
            Instruction::Move { node, neighbor } => [tag::MOVE, node, neighbor, NIL, NIL],
            Instruction::Inherit {
                snek_base,
                snek_head,
                v2,
                v1,
            } => [tag::INHERIT, snek_base, snek_head, v2, v1],
            Instruction::Reverse { base, new_tail } => [tag::REVERSE, base, new_tail, NIL, NIL],
            Instruction::Concatenate {
                hunter_base,
                hunter_head,
                target,
            } => [tag::CONCATENATE, hunter_base, hunter_head, target, NIL],
        }
    }

    /// Decode one wire record. An unrecognized tag comes back as `Err` so the
    /// interpreter can log and drop it (forward compatibility).
    pub fn decode(w: &Wire) -> Result<Instruction, u32> {
        match w[0] {
            tag::KEEP_ALIVE => Ok(Instruction::KeepAlive),
            tag::DELETE => Ok(Instruction::Delete {
                node: w[1],
                neighbor: w[2],
            }),
            tag::MOVE => Ok(Instruction::Move {
                node: w[1],
                neighbor: w[2],
            }),
            tag::INHERIT => Ok(Instruction::Inherit {
                snek_base: w[1],
                snek_head: w[2],
                v2: w[3],
                v1: w[4],
            }),
            tag::REVERSE => Ok(Instruction::Reverse {
                base: w[1],
                new_tail: w[2],
            }),
            tag::CONCATENATE => Ok(Instruction::Concatenate {
                hunter_base: w[1],
                hunter_head: w[2],
                target: w[3],
            }),
            unknown => Err(unknown),
        }
    }
}
