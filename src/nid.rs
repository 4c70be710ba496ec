//! The vertex-id scalar used throughout the engine.
//!
//! Every cross-process reference is a [`Nid`] — never an in-process slot or
//! index. Local stores may cache slot positions internally, but anything that
//! crosses a partition boundary (instruction payloads, snake links, matching
//! pairs) names vertices by id alone. That rule is what makes received
//! instructions self-contained.
//!
//! Ids are 0-based internally; the text interface speaks 1-based ids and the
//! conversion happens at the parse/print edge only.

/// Vertex identifier. Wide enough for the number of vertices and for the
/// number of processes.
pub type Nid = u32;

/// Sentinel for an unused payload slot on the wire.
///
/// Valid ids are bounded by the global vertex count, which the input format
/// caps well below this value.
pub const NIL: Nid = Nid::MAX;
