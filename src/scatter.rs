//! Initial distribution of the input graph over the substrate.
//!
//! Only process 0 holds the parsed input. Before Phase I it tells every
//! process the global vertex count and how many edges to expect (so each can
//! size its receive buffer), then puts every edge into the buffer of each
//! owning process — once per incident partition, so a cross-partition edge
//! lands on both of its owners.

use crate::bsp::Bsp;
use crate::edgelist::EdgeList;
use crate::nid::Nid;
use crate::partition::Partition;
use anyhow::Result;

/// Scatter the edges from process 0; every process returns the global vertex
/// count and the edges relevant to it.
pub fn scatter(
    bsp: &Bsp,
    partition: Partition,
    input: Option<&EdgeList>,
) -> Result<(Nid, Vec<(Nid, Nid)>)> {
    let n_procs = bsp.n_procs();

    // Header: global vertex count and per-process edge count.
    bsp.register(2)?;
    bsp.barrier()?;
    if let Some(list) = input {
        let mut counts = vec![0u32; n_procs];
        for &(u, v) in &list.edges {
            let p1 = partition.owner(u, list.n_vertices, n_procs);
            let p2 = partition.owner(v, list.n_vertices, n_procs);
            counts[p1] += 1;
            if p2 != p1 {
                counts[p2] += 1;
            }
        }
        for (q, &count) in counts.iter().enumerate() {
            bsp.put(q, 0, &[list.n_vertices, count])?;
        }
    }
    bsp.barrier()?;
    let header = bsp.unregister()?;
    let (n_global, n_edges) = (header[0], header[1] as usize);

    // Payload: each incident edge, two words per edge.
    bsp.register(2 * n_edges)?;
    bsp.barrier()?;
    if let Some(list) = input {
        let mut placed = vec![0usize; n_procs];
        for &(u, v) in &list.edges {
            let p1 = partition.owner(u, list.n_vertices, n_procs);
            let p2 = partition.owner(v, list.n_vertices, n_procs);
            bsp.put(p1, 2 * placed[p1], &[u, v])?;
            placed[p1] += 1;
            if p2 != p1 {
                bsp.put(p2, 2 * placed[p2], &[u, v])?;
                placed[p2] += 1;
            }
        }
    }
    bsp.barrier()?;
    let buf = bsp.unregister()?;

    let edges = buf.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect();
    Ok((n_global, edges))
}
