//! Edge-list input: the text format the engine is fed on stdin.
//!
//! The format is a header `V E` followed by `E` lines of `u v`, with ids
//! 1-based. Parsing converts to the engine's 0-based ids and validates
//! before any parallel work begins: malformed input aborts on process 0
//! with a diagnostic, never mid-run.
//!
//! Duplicate edges are legal (they collapse when the local graphs load);
//! self-loops are not — a simple graph is a precondition of the matching
//! semantics.

use crate::nid::Nid;
use anyhow::{Context, Result, bail};

/// A parsed input graph, ids 0-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeList {
    pub n_vertices: Nid,
    pub edges: Vec<(Nid, Nid)>,
}

impl EdgeList {
    pub fn new(n_vertices: Nid, edges: Vec<(Nid, Nid)>) -> Self {
        Self { n_vertices, edges }
    }

    /// Parse the `V E` header and edge lines from a whitespace token stream,
    /// consuming exactly the graph's tokens.
    pub fn parse_tokens<'a, I>(tokens: &mut I) -> Result<EdgeList>
    where
        I: Iterator<Item = &'a str>,
    {
        let n_vertices: Nid = next_token(tokens, "vertex count")?;
        let n_edges: usize = next_token(tokens, "edge count")?;

        let mut edges = Vec::with_capacity(n_edges);
        for i in 0..n_edges {
            let u: Nid = next_token(tokens, "edge endpoint")
                .with_context(|| format!("edge {} of {}", i + 1, n_edges))?;
            let v: Nid = next_token(tokens, "edge endpoint")
                .with_context(|| format!("edge {} of {}", i + 1, n_edges))?;
            if u == 0 || v == 0 || u > n_vertices || v > n_vertices {
                bail!(
                    "edge {} of {}: endpoint out of range (vertices are 1..={})",
                    i + 1,
                    n_edges,
                    n_vertices
                );
            }
            if u == v {
                bail!("edge {} of {}: self-loop at vertex {}", i + 1, n_edges, u);
            }
            edges.push((u - 1, v - 1));
        }
        Ok(EdgeList { n_vertices, edges })
    }

    /// Parse a whole graph from text (for tests and tools; the binary parses
    /// the same stream incrementally because the process count follows it).
    pub fn parse(text: &str) -> Result<EdgeList> {
        let mut tokens = text.split_whitespace();
        let list = Self::parse_tokens(&mut tokens)?;
        Ok(list)
    }

    /// Render back to the input format (1-based), e.g. to feed the binary.
    pub fn to_text(&self) -> String {
        let mut out = format!("{} {}\n", self.n_vertices, self.edges.len());
        for &(u, v) in &self.edges {
            out.push_str(&format!("{} {}\n", u + 1, v + 1));
        }
        out
    }
}

/// Read and parse one whitespace token.
pub fn next_token<'a, I, T>(tokens: &mut I, what: &str) -> Result<T>
where
    I: Iterator<Item = &'a str>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let token = tokens
        .next()
        .with_context(|| format!("unexpected end of input while reading {what}"))?;
    token
        .parse()
        .with_context(|| format!("invalid {what}: {token:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_zero_bases() {
        let list = EdgeList::parse("3 2\n1 2\n2 3\n").unwrap();
        assert_eq!(list.n_vertices, 3);
        assert_eq!(list.edges, vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn rejects_out_of_range_and_self_loops() {
        assert!(EdgeList::parse("3 1\n1 4\n").is_err());
        assert!(EdgeList::parse("3 1\n0 1\n").is_err());
        assert!(EdgeList::parse("3 1\n2 2\n").is_err());
        assert!(EdgeList::parse("3 2\n1 2\n").is_err());
    }

    #[test]
    fn text_round_trip() {
        let list = EdgeList::new(4, vec![(0, 1), (2, 3)]);
        assert_eq!(EdgeList::parse(&list.to_text()).unwrap(), list);
    }
}
