//! Exchange-layer behavior over the live substrate: disjoint delivery,
//! source grouping, soft-dedup, and the keep-alive liveness fill.

use anyhow::Result;
use sidewinder::bsp::run_spmd;
use sidewinder::exchange::exchange_round;
use sidewinder::instruction::Instruction;
use sidewinder::outbox::Outbox;

type Mail = Vec<(usize, Instruction)>;

#[test]
fn traffic_matrix_delivers_grouped_and_complete() -> Result<()> {
    const P: usize = 3;
    let mails: Vec<(Mail, usize)> = run_spmd(P, |bsp| {
        let mut outbox = Outbox::new(P);
        // Process p sends p+1 distinct deletions to every destination.
        for dest in 0..P {
            for i in 0..=bsp.pid() as u32 {
                outbox.add(dest, Instruction::Delete {
                    node: bsp.pid() as u32,
                    neighbor: i,
                });
            }
        }
        let mail = exchange_round(&bsp, &mut outbox)?;
        Ok((mail.instructions, mail.total))
    })?;

    for (mail, total) in mails {
        assert_eq!(total, (1..=P).sum::<usize>());
        assert_eq!(mail.len(), total);
        // Grouped by source, ascending, each block in queue order.
        let mut expected = Vec::new();
        for src in 0..P {
            for i in 0..=src as u32 {
                expected.push((src, Instruction::Delete {
                    node: src as u32,
                    neighbor: i,
                }));
            }
        }
        assert_eq!(mail, expected);
    }
    Ok(())
}

#[test]
fn immediate_duplicate_is_delivered_once() -> Result<()> {
    const P: usize = 3;
    let mails: Vec<Mail> = run_spmd(P, |bsp| {
        let mut outbox = Outbox::new(P);
        if bsp.pid() == 0 {
            let del = Instruction::Delete {
                node: 7,
                neighbor: 8,
            };
            outbox.add(1, del);
            outbox.add(1, del);
        }
        Ok(exchange_round(&bsp, &mut outbox)?.instructions)
    })?;

    assert_eq!(mails[1], vec![(0, Instruction::Delete {
        node: 7,
        neighbor: 8
    })]);
    Ok(())
}

#[test]
fn silent_peers_receive_keep_alive() -> Result<()> {
    const P: usize = 4;
    let totals: Vec<(Mail, usize)> = run_spmd(P, |bsp| {
        let mut outbox = Outbox::new(P);
        if bsp.pid() == 0 {
            outbox.add(1, Instruction::Move {
                node: 0,
                neighbor: 1,
            });
        }
        let mail = exchange_round(&bsp, &mut outbox)?;
        Ok((mail.instructions, mail.total))
    })?;

    // Everyone saw traffic, so nobody would leave the round loop.
    for (pid, (mail, total)) in totals.iter().enumerate() {
        assert!(*total > 0, "process {pid} saw an empty round");
        if pid != 1 {
            assert_eq!(mail, &vec![(0, Instruction::KeepAlive)]);
        }
    }
    assert_eq!(totals[1].0, vec![(0, Instruction::Move {
        node: 0,
        neighbor: 1
    })]);
    Ok(())
}

#[test]
fn quiet_everywhere_means_zero_total() -> Result<()> {
    let totals: Vec<usize> = run_spmd(3, |bsp| {
        let mut outbox = Outbox::new(3);
        Ok(exchange_round(&bsp, &mut outbox)?.total)
    })?;
    assert_eq!(totals, vec![0, 0, 0]);
    Ok(())
}
