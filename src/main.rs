//! The sidewinder binary: edge list in, matching out.
//!
//! Reads from stdin: the graph (`V E` header plus `E` edge lines, 1-based),
//! then the number of processes to run on. Prints the matching as 1-based
//! `u v` lines, grouped by the process that recorded each pair. All input is
//! validated before any parallel work starts, and a bad process count exits
//! non-zero with a diagnostic.
//!
//! Logging goes through `tracing`; set `RUST_LOG=sidewinder=debug` to watch
//! the phases quiesce. With the `stats` feature (default), setting
//! `SIDEWINDER_STATS=<path>` writes the JSON run report there.

use anyhow::{Result, bail};
use sidewinder::edgelist::{self, EdgeList};
use sidewinder::{EngineConfig, Partition, bsp, run};
use std::io::Read;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text)?;
    let mut tokens = text.split_whitespace();

    let input = EdgeList::parse_tokens(&mut tokens)?;
    let n_procs: usize = edgelist::next_token(&mut tokens, "process count")?;
    if n_procs == 0 || n_procs > bsp::capacity() {
        bail!(
            "cannot start {n_procs} processes (between 1 and {} supported)",
            bsp::capacity()
        );
    }

    let config = EngineConfig {
        n_procs,
        partition: partition_from_env()?,
    };
    let outcomes = run(config, &input)?;

    for outcome in &outcomes {
        for &(a, b) in &outcome.matching {
            println!("{} {}", a + 1, b + 1);
        }
    }

    #[cfg(feature = "stats")]
    if let Ok(path) = std::env::var("SIDEWINDER_STATS") {
        sidewinder::stats::RunReport::new(config, &outcomes).save_to_file(path)?;
    }

    Ok(())
}

/// Partition strategy selection: `SIDEWINDER_PARTITION=block|cyclic`,
/// defaulting to block.
fn partition_from_env() -> Result<Partition> {
    match std::env::var("SIDEWINDER_PARTITION") {
        Ok(value) => match value.as_str() {
            "block" => Ok(Partition::Block),
            "cyclic" => Ok(Partition::Cyclic),
            other => bail!("unknown partition strategy {other:?} (block or cyclic)"),
        },
        Err(_) => Ok(Partition::Block),
    }
}
