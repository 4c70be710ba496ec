//! End-to-end scenarios with pinned expected matchings.

use anyhow::Result;
use sidewinder::Partition;
use sidewinder::edgelist::EdgeList;
use sidewinder::testing::*;

#[test]
fn path_p3_matches_one_edge() -> Result<()> {
    let input = EdgeList::parse("3 2\n1 2\n2 3\n")?;
    let matching = run_matching(&input, 2, Partition::Block)?;
    assert_valid_matching(&input, &matching);
    assert_maximal_matching(&input, &matching);
    assert_eq!(matching.len(), 1);
    assert!(matching == vec![(0, 1)] || matching == vec![(1, 2)]);
    Ok(())
}

#[test]
fn path_p4_matches_both_ends() -> Result<()> {
    let input = EdgeList::parse("4 3\n1 2\n2 3\n3 4\n")?;
    let matching = run_matching(&input, 2, Partition::Block)?;
    assert_eq!(matching, vec![(0, 1), (2, 3)]);
    Ok(())
}

#[test]
fn star_matches_center_to_one_leaf() -> Result<()> {
    let input = EdgeList::parse("5 4\n1 2\n1 3\n1 4\n1 5\n")?;
    let matching = run_matching(&input, 2, Partition::Cyclic)?;
    assert_valid_matching(&input, &matching);
    assert_maximal_matching(&input, &matching);
    assert_eq!(matching.len(), 1);
    let (a, b) = matching[0];
    assert!(a == 0 || b == 0, "the center must be matched");
    Ok(())
}

#[test]
fn triangle_on_three_processes() -> Result<()> {
    let input = EdgeList::parse("3 3\n1 2\n2 3\n1 3\n")?;
    let matching = run_matching(&input, 3, Partition::Cyclic)?;
    assert_valid_matching(&input, &matching);
    assert_maximal_matching(&input, &matching);
    assert_eq!(matching.len(), 1);
    Ok(())
}

#[test]
fn disjoint_edges_resolve_symmetric_claims() -> Result<()> {
    // Every vertex on its own process: both matches need a cross-process
    // MOVE, and each pair's claims are symmetric.
    let input = EdgeList::parse("4 2\n1 2\n3 4\n")?;
    let matching = run_matching(&input, 4, Partition::Cyclic)?;
    assert_eq!(matching, vec![(0, 1), (2, 3)]);
    Ok(())
}

#[test]
fn even_cycle_matches_perfectly() -> Result<()> {
    let input = EdgeList::parse("6 6\n1 2\n2 3\n3 4\n4 5\n5 6\n6 1\n")?;
    let matching = run_matching(&input, 2, Partition::Block)?;
    assert_valid_matching(&input, &matching);
    assert_maximal_matching(&input, &matching);
    assert_eq!(matching.len(), 3);
    Ok(())
}

#[test]
fn empty_graph_is_immediately_quiescent() -> Result<()> {
    let input = EdgeList::parse("0 0\n")?;
    let outcomes = sidewinder::run(
        sidewinder::EngineConfig {
            n_procs: 1,
            partition: Partition::Block,
        },
        &input,
    )?;
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].matching.is_empty());
    for report in [
        outcomes[0].elimination,
        outcomes[0].formation,
        outcomes[0].extraction,
        outcomes[0].completion,
    ] {
        assert_eq!(report.rounds, 1);
        assert_eq!(report.received, 0);
    }
    Ok(())
}

#[test]
fn edgeless_graph_matches_nothing() -> Result<()> {
    let input = EdgeList::new(5, vec![]);
    for p in [1, 2, 4] {
        let matching = run_matching(&input, p, Partition::Cyclic)?;
        assert!(matching.is_empty());
    }
    Ok(())
}

#[test]
fn single_process_never_communicates() -> Result<()> {
    let input = cycle_graph(7);
    let outcomes = sidewinder::run(
        sidewinder::EngineConfig {
            n_procs: 1,
            partition: Partition::Block,
        },
        &input,
    )?;
    let outcome = &outcomes[0];
    for report in [
        outcome.elimination,
        outcome.formation,
        outcome.extraction,
        outcome.completion,
    ] {
        assert_eq!(report.received, 0, "P=1 must stay purely local");
    }
    assert_valid_matching(&input, &outcome.matching);
    Ok(())
}

#[test]
fn input_files_round_trip() -> Result<()> {
    let input = path_graph(5);
    let file = write_input_file(&input)?;
    let text = std::fs::read_to_string(file.path())?;
    assert_eq!(EdgeList::parse(&text)?, input);
    Ok(())
}

#[test]
fn complete_graph_is_near_perfect() -> Result<()> {
    for n in [4u32, 5, 7, 8] {
        let input = complete_graph(n);
        for p in [1, 2, 3] {
            let matching = run_matching(&input, p, Partition::Block)?;
            assert_valid_matching(&input, &matching);
            assert_maximal_matching(&input, &matching);
            assert!(
                matching.len() + 1 >= (n as usize) / 2,
                "K_{n} at P={p}: got {} matches",
                matching.len()
            );
        }
    }
    Ok(())
}
