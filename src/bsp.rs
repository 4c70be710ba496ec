//! The in-process BSP substrate.
//!
//! The engine consumes exactly six primitives: `n_procs`, `pid`, `barrier`,
//! `register`, `put`, and `unregister`. This module provides them over a
//! dedicated rayon pool: [`run_spmd`] builds a pool of exactly P threads and
//! `broadcast`s the SPMD body onto every worker, so pid = worker index and
//! every process runs the same program.
//!
//! Communication is one-sided: a process registers a word buffer, and after
//! the next barrier its peers may `put` into it; after the barrier that
//! follows the puts, the owner reads the buffer back with `unregister`.
//! There is no remote read. Senders are responsible for disjoint offsets —
//! the exchange layer pre-computes them, so two puts never land on the same
//! words.
//!
//! Substrate failures (put into an unregistered buffer, out-of-range offset,
//! barrier mismatch after a peer died) are fatal: the failing worker poisons
//! the barrier, every peer's next `barrier` call errors out, and the first
//! real error surfaces from [`run_spmd`]. The core never attempts recovery.

use anyhow::{Context, Result, anyhow, bail};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex};

/// Error returned from [`Bsp::barrier`] after a peer's failure poisoned the
/// run. Downcasting to it lets the launcher tell a victim from the culprit.
#[derive(Clone, Copy, Debug)]
pub struct BarrierPoisoned;

impl fmt::Display for BarrierPoisoned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("barrier poisoned by a failed peer")
    }
}

impl std::error::Error for BarrierPoisoned {}

/// Upper bound on P for one run. Workers block at barriers for most of their
/// lifetime, so modest oversubscription of the physical cores is harmless;
/// the cap guards absurd inputs, not scheduling.
pub fn capacity() -> usize {
    (4 * num_cpus::get()).max(8)
}

struct BarrierState {
    count: usize,
    generation: u64,
    poisoned: bool,
}

/// A reusable barrier that can be poisoned: once any worker fails, every
/// waiter (current and future) gets an error instead of blocking forever.
struct PoisonBarrier {
    n: usize,
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

impl PoisonBarrier {
    fn new(n: usize) -> Self {
        Self {
            n,
            state: Mutex::new(BarrierState {
                count: 0,
                generation: 0,
                poisoned: false,
            }),
            cvar: Condvar::new(),
        }
    }

    fn wait(&self) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        if s.poisoned {
            return Err(BarrierPoisoned.into());
        }
        s.count += 1;
        if s.count == self.n {
            s.count = 0;
            s.generation += 1;
            self.cvar.notify_all();
            return Ok(());
        }
        let generation = s.generation;
        while s.generation == generation && !s.poisoned {
            s = self.cvar.wait(s).unwrap();
        }
        if s.poisoned {
            return Err(BarrierPoisoned.into());
        }
        Ok(())
    }

    fn poison(&self) {
        let mut s = self.state.lock().unwrap();
        s.poisoned = true;
        self.cvar.notify_all();
    }
}

struct Shared {
    n_procs: usize,
    barrier: PoisonBarrier,
    slots: Vec<Mutex<Option<Vec<u32>>>>,
}

/// A process's handle onto the substrate.
pub struct Bsp {
    pid: usize,
    shared: Arc<Shared>,
}

impl Bsp {
    pub fn n_procs(&self) -> usize {
        self.shared.n_procs
    }

    pub fn pid(&self) -> usize {
        self.pid
    }

    /// Block until every process reaches the same call.
    pub fn barrier(&self) -> Result<()> {
        self.shared.barrier.wait()
    }

    /// Register this process's receive buffer of `words` zeroed words. Peers
    /// may put into it after the next barrier.
    pub fn register(&self, words: usize) -> Result<()> {
        let mut slot = self.shared.slots[self.pid].lock().unwrap();
        if slot.is_some() {
            bail!("process {}: buffer already registered", self.pid);
        }
        *slot = Some(vec![0; words]);
        Ok(())
    }

    /// One-sided put of `words` into `target`'s registered buffer at word
    /// offset `offset`. Visible to the target after the next barrier.
    pub fn put(&self, target: usize, offset: usize, words: &[u32]) -> Result<()> {
        let slot = self
            .shared
            .slots
            .get(target)
            .ok_or_else(|| anyhow!("put target {target} out of range"))?;
        let mut slot = slot.lock().unwrap();
        let buf = slot
            .as_mut()
            .ok_or_else(|| anyhow!("put into unregistered buffer of process {target}"))?;
        let end = offset
            .checked_add(words.len())
            .filter(|&end| end <= buf.len())
            .ok_or_else(|| {
                anyhow!(
                    "put past end of process {target}'s buffer ({offset}+{} > {})",
                    words.len(),
                    buf.len()
                )
            })?;
        buf[offset..end].copy_from_slice(words);
        Ok(())
    }

    /// Deregister this process's buffer and take its contents.
    pub fn unregister(&self) -> Result<Vec<u32>> {
        self.shared.slots[self.pid]
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow!("process {}: no buffer registered", self.pid))
    }
}

/// Launch `n_procs` SPMD workers and run `body` on each.
///
/// Results come back in pid order. If any worker fails, the barrier is
/// poisoned so its peers unblock and fail too; the first non-poison error is
/// returned.
pub fn run_spmd<R, F>(n_procs: usize, body: F) -> Result<Vec<R>>
where
    R: Send,
    F: Fn(Bsp) -> Result<R> + Sync,
{
    if n_procs == 0 {
        bail!("cannot run on zero processes");
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_procs)
        .build()
        .context("building the SPMD worker pool")?;
    let shared = Arc::new(Shared {
        n_procs,
        barrier: PoisonBarrier::new(n_procs),
        slots: (0..n_procs).map(|_| Mutex::new(None)).collect(),
    });

    let results: Vec<Result<R>> = pool.broadcast(|ctx| {
        let bsp = Bsp {
            pid: ctx.index(),
            shared: Arc::clone(&shared),
        };
        let out = body(bsp);
        if out.is_err() {
            shared.barrier.poison();
        }
        out
    });

    let mut collected = Vec::with_capacity(n_procs);
    let mut poisoned: Option<anyhow::Error> = None;
    for (pid, result) in results.into_iter().enumerate() {
        match result {
            Ok(r) => collected.push(r),
            Err(e) => {
                if e.downcast_ref::<BarrierPoisoned>().is_none() {
                    return Err(e.context(format!("process {pid} failed")));
                }
                poisoned.get_or_insert(e);
            }
        }
    }
    if let Some(e) = poisoned
        && collected.len() < n_procs
    {
        return Err(e.context("a peer failed and poisoned the barrier"));
    }
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_pids_are_dense() -> Result<()> {
        let pids = run_spmd(4, |bsp| {
            bsp.barrier()?;
            Ok(bsp.pid())
        })?;
        assert_eq!(pids, vec![0, 1, 2, 3]);
        Ok(())
    }

    #[test]
    fn put_is_visible_after_the_barrier() -> Result<()> {
        let received = run_spmd(3, |bsp| {
            let n = bsp.n_procs();
            bsp.register(n)?;
            bsp.barrier()?;
            for target in 0..n {
                bsp.put(target, bsp.pid(), &[bsp.pid() as u32 + 100])?;
            }
            bsp.barrier()?;
            bsp.unregister()
        })?;
        for buf in received {
            assert_eq!(buf, vec![100, 101, 102]);
        }
        Ok(())
    }

    #[test]
    fn put_into_unregistered_buffer_is_fatal() {
        let out = run_spmd(2, |bsp| {
            // Nobody registers; the put must fail on every worker.
            bsp.put(1 - bsp.pid(), 0, &[7])?;
            Ok(())
        });
        let err = out.unwrap_err().to_string();
        assert!(err.contains("failed"), "unexpected error: {err}");
    }
}
