//! # Sidewinder
//!
//! A **bulk-synchronous parallel maximal matching engine** for undirected
//! simple graphs. Sidewinder shards the input graph over P cooperating
//! processes, runs a superstep-synchronized instruction protocol between
//! them, and returns a maximal matching — a set of edges no two of which
//! share a vertex, to which no further edge can be added.
//!
//! ## Key ideas
//!
//! - **Partitioned state** — each process owns a disjoint vertex partition
//!   ([`Partition`]); cross-partition edges induce coordination, and every
//!   cross-process reference is a plain vertex id.
//! - **Instruction protocol** — processes exchange fixed-width, tagged,
//!   self-contained requests ([`instruction::Instruction`]) through a
//!   three-barrier all-to-all ([`exchange`]); a round loop terminates when
//!   a full round moves nothing anywhere ([`rounds`]).
//! - **Singleton elimination** — degree-1 vertices match greedily and
//!   removals cascade across partitions ([`phase1`]).
//! - **Snakes** — surviving vertices form chains that merge end-to-end
//!   across process boundaries, then get paired off along their paths
//!   ([`snake`], [`pairing`]); a mutual-proposal completion sweep
//!   guarantees maximality regardless of how the greedy chains fell
//!   ([`completion`]).
//!
//! ## Quick start
//!
//! ```no_run
//! use sidewinder::{EngineConfig, Partition, run};
//! use sidewinder::edgelist::EdgeList;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! // A path on four vertices (ids are 1-based in the text format).
//! let input = EdgeList::parse("4 3\n1 2\n2 3\n3 4\n")?;
//!
//! let outcomes = run(
//!     EngineConfig { n_procs: 2, partition: Partition::Block },
//!     &input,
//! )?;
//!
//! let total: usize = outcomes.iter().map(|o| o.matching.len()).sum();
//! assert_eq!(total, 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Execution model
//!
//! Strict SPMD BSP: [`bsp::run_spmd`] builds a dedicated pool of exactly P
//! worker threads and broadcasts the same program onto each. Inside a
//! superstep a process computes freely on its own graph slice; between
//! supersteps the only communication is one-sided puts into peers'
//! registered buffers, and a barrier makes all puts visible at once. There
//! is no shared graph state and no locking in the core — disjoint put
//! offsets are agreed in advance by the count/offset exchange.
//!
//! ## Testing
//!
//! The [`testing`] module ships graph builders (paths, cycles, stars,
//! complete and seeded-random graphs), an end-to-end [`testing::run_matching`]
//! helper, and the two assertions that define a correct result:
//! [`testing::assert_valid_matching`] and
//! [`testing::assert_maximal_matching`].
//!
//! ## Feature flags
//!
//! - `stats` *(default)* — per-phase round/traffic counters and a JSON run
//!   report ([`stats`]).
//!
//! ## Module overview
//!
//! - [`nid`] — the vertex-id scalar
//! - [`partition`] — block/cyclic ownership
//! - [`graph`] — the per-process graph store
//! - [`instruction`] — instruction sum type and wire codec
//! - [`outbox`] — per-destination queues, dedup, liveness fill
//! - [`bsp`] — the in-process substrate and SPMD launcher
//! - [`exchange`] — count/offset/payload all-to-all
//! - [`rounds`] — the generic round loop
//! - [`phase1`], [`snake`], [`pairing`], [`completion`] — the phase drivers
//! - [`engine`] — configuration and sequencing
//! - [`scatter`], [`edgelist`] — input distribution and parsing
//! - [`testing`] — builders and assertions

pub mod bsp;
pub mod completion;
pub mod edgelist;
pub mod engine;
pub mod exchange;
pub mod graph;
pub mod instruction;
pub mod nid;
pub mod outbox;
pub mod pairing;
pub mod partition;
pub mod phase1;
pub mod rounds;
pub mod scatter;
pub mod snake;
pub mod testing;

#[cfg(feature = "stats")]
pub mod stats;

// General re-exports
pub use edgelist::EdgeList;
pub use engine::{EngineConfig, ProcessOutcome, run};
pub use nid::{NIL, Nid};
pub use partition::Partition;
pub use rounds::LoopReport;
