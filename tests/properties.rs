//! Property coverage: validity, maximality, and determinism over seeded
//! random graphs, every partition strategy, and a sweep of process counts.

use anyhow::Result;
use sidewinder::Partition;
use sidewinder::testing::*;

#[test]
fn random_graphs_are_valid_maximal_and_deterministic() -> Result<()> {
    for seed in 1..=6u64 {
        for n in [6u32, 9, 13] {
            let input = random_graph(n, (n + n / 2) as usize, seed);
            for n_procs in [1usize, 2, 3, 4] {
                for partition in [Partition::Block, Partition::Cyclic] {
                    let matching = run_matching(&input, n_procs, partition)?;
                    assert_valid_matching(&input, &matching);
                    assert_maximal_matching(&input, &matching);

                    let again = run_matching(&input, n_procs, partition)?;
                    assert_eq!(
                        matching, again,
                        "seed {seed}, n {n}, P {n_procs}, {partition:?}: nondeterministic result"
                    );
                }
            }
        }
    }
    Ok(())
}

#[test]
fn every_process_count_up_to_v_works() -> Result<()> {
    let input = random_graph(7, 10, 42);
    for partition in [Partition::Block, Partition::Cyclic] {
        for n_procs in 1..=7usize {
            let matching = run_matching(&input, n_procs, partition)?;
            assert_valid_matching(&input, &matching);
            assert_maximal_matching(&input, &matching);
        }
    }
    Ok(())
}

#[test]
fn dense_and_sparse_extremes() -> Result<()> {
    for (input, label) in [
        (complete_graph(9), "K9"),
        (star_graph(8), "S8"),
        (path_graph(11), "P11"),
        (cycle_graph(10), "C10"),
        (cycle_graph(9), "C9"),
    ] {
        for n_procs in [2usize, 3] {
            for partition in [Partition::Block, Partition::Cyclic] {
                let matching = run_matching(&input, n_procs, partition)?;
                assert_valid_matching(&input, &matching);
                assert_maximal_matching(&input, &matching);
                assert!(!matching.is_empty(), "{label} must match something");
            }
        }
    }
    // Perfect matchings exist on these and maximality forces near-perfect.
    let even_cycle = run_matching(&cycle_graph(10), 2, Partition::Block)?;
    assert_eq!(even_cycle.len(), 5);
    Ok(())
}
