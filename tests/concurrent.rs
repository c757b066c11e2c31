#![cfg(not(loom))]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use wfistack::{Node, Stack};

const PRODUCERS: usize = 4;
const PER_PRODUCER: usize = 2_000;
const TOTAL: usize = PRODUCERS * PER_PRODUCER;

fn nodes(n: usize) -> Vec<Node<usize>> {
    (0..n).map(Node::new).collect()
}

fn assert_exact_partition(mut taken: Vec<usize>, total: usize) {
    taken.sort_unstable();
    let expected: Vec<usize> = (0..total).collect();
    assert_eq!(taken, expected);
}

#[test]
fn every_pushed_node_is_taken_once() {
    let nodes = nodes(TOTAL);
    let stack: Stack<'_, Node<usize>> = Stack::new();
    let done = AtomicBool::new(false);

    let mut taken = thread::scope(|s| {
        let stack = &stack;
        let done = &done;

        let consumers: Vec<_> = (0..3)
            .map(|_| {
                s.spawn(move || {
                    let mut taken = vec![];
                    while !done.load(Ordering::Acquire) {
                        match rand::random::<u8>() % 3 {
                            0 => taken.extend(stack.pop_all().iter().map(|n| n.val)),
                            1 => taken.extend(stack.pop_all_fifo().iter().map(|n| n.val)),
                            _ => taken.extend(stack.pop().map(|n| n.val)),
                        }
                    }
                    taken
                })
            })
            .collect();

        let producers: Vec<_> = nodes
            .chunks(PER_PRODUCER)
            .map(|chunk| {
                s.spawn(move || {
                    for (i, node) in chunk.iter().enumerate() {
                        if i % 2 == 0 {
                            stack.push(node);
                        } else {
                            stack.peek_and_push(node);
                        }
                    }
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }
        done.store(true, Ordering::Release);

        consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect::<Vec<usize>>()
    });

    taken.extend(stack.pop_all().iter().map(|n| n.val));
    assert!(stack.is_empty());
    assert_exact_partition(taken, TOTAL);
}

#[test]
fn racing_pop_all_never_overlap() {
    let nodes = nodes(TOTAL);
    let stack: Stack<'_, Node<usize>> = Stack::new();
    let done = AtomicBool::new(false);

    let mut drains = thread::scope(|s| {
        let stack = &stack;
        let done = &done;

        let drainers: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(move || {
                    let mut drains: Vec<Vec<usize>> = vec![];
                    while !done.load(Ordering::Acquire) {
                        drains.push(stack.pop_all().iter().map(|n| n.val).collect());
                    }
                    drains
                })
            })
            .collect();

        let producers: Vec<_> = nodes
            .chunks(PER_PRODUCER)
            .map(|chunk| s.spawn(move || chunk.iter().for_each(|n| stack.push(n))))
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }
        done.store(true, Ordering::Release);

        drainers
            .into_iter()
            .flat_map(|d| d.join().unwrap())
            .collect::<Vec<Vec<usize>>>()
    });

    drains.push(stack.pop_all().iter().map(|n| n.val).collect());

    let mut seen = HashSet::new();
    for drain in &drains {
        for &val in drain {
            assert!(seen.insert(val), "node {val} taken twice");
        }
    }
    assert_eq!(seen.len(), TOTAL);
}

#[test]
fn drained_chains_keep_per_producer_order() {
    let nodes = nodes(TOTAL);
    let stack: Stack<'_, Node<usize>> = Stack::new();

    thread::scope(|s| {
        let stack = &stack;
        for chunk in nodes.chunks(PER_PRODUCER) {
            s.spawn(move || chunk.iter().for_each(|n| stack.push(n)));
        }
    });

    let fifo: Vec<usize> = stack.pop_all_fifo().iter().map(|n| n.val).collect();

    assert_eq!(fifo.len(), TOTAL);
    for producer in 0..PRODUCERS {
        let own: Vec<usize> = fifo
            .iter()
            .copied()
            .filter(|v| v / PER_PRODUCER == producer)
            .collect();
        let expected: Vec<usize> =
            (producer * PER_PRODUCER..(producer + 1) * PER_PRODUCER).collect();
        assert_eq!(own, expected);
    }
}

#[test]
fn replace_all_partitions_with_replacements() {
    let nodes = nodes(TOTAL);
    let stack: Stack<'_, Node<usize>> = Stack::new();

    let mut taken = thread::scope(|s| {
        let stack = &stack;
        let workers: Vec<_> = nodes
            .chunks(PER_PRODUCER)
            .map(|chunk| {
                s.spawn(move || {
                    let mut taken = vec![];
                    for (i, node) in chunk.iter().enumerate() {
                        match i % 4 {
                            0 => taken.extend(stack.replace_all(node).iter().map(|n| n.val)),
                            1 => taken.extend(stack.replace_all_fifo(node).iter().map(|n| n.val)),
                            _ => stack.push(node),
                        }
                    }
                    taken
                })
            })
            .collect();

        workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect::<Vec<usize>>()
    });

    taken.extend(stack.pop_all().iter().map(|n| n.val));
    assert_exact_partition(taken, TOTAL);
}

#[test]
fn live_iteration_terminates_under_pops() {
    let nodes = nodes(TOTAL);
    let stack: Stack<'_, Node<usize>> = Stack::new();
    nodes.iter().for_each(|n| stack.push(n));

    thread::scope(|s| {
        let stack = &stack;
        s.spawn(move || while stack.pop().is_some() {});
        s.spawn(move || {
            for _ in 0..16 {
                assert!(stack.iter().all(|n| n.val < TOTAL));
                assert!(stack.size() <= TOTAL);
            }
        });
    });

    assert!(stack.pop().is_none());
}

#[test]
fn live_iteration_terminates_under_fifo_drains() {
    const REPLACEMENTS: usize = 512;
    const ALL: usize = TOTAL + REPLACEMENTS;

    let nodes = nodes(ALL);
    let (pushed, replacements) = nodes.split_at(TOTAL);
    let stack: Stack<'_, Node<usize>> = Stack::new();
    let done = AtomicBool::new(false);

    let mut taken = thread::scope(|s| {
        let stack = &stack;
        let done = &done;

        let drainer = s.spawn(move || {
            let mut taken = vec![];
            let mut replacements = replacements.iter();
            while !done.load(Ordering::Acquire) {
                match replacements.next() {
                    Some(node) => taken.extend(stack.replace_all_fifo(node).iter().map(|n| n.val)),
                    None => taken.extend(stack.pop_all_fifo().iter().map(|n| n.val)),
                }
            }
            // never pushed
            taken.extend(replacements.map(|n| n.val));
            taken
        });

        let readers: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(move || {
                    while !done.load(Ordering::Acquire) {
                        let mut walked = 0;
                        for node in stack.iter() {
                            assert!(node.val < ALL);
                            walked += 1;
                        }
                        // a reversed chain can be walked down and back up once
                        assert!(walked < 2 * ALL, "walked {walked} nodes");
                    }
                })
            })
            .collect();

        let producers: Vec<_> = pushed
            .chunks(PER_PRODUCER)
            .map(|chunk| s.spawn(move || chunk.iter().for_each(|n| stack.push(n))))
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }
        done.store(true, Ordering::Release);

        for reader in readers {
            reader.join().unwrap();
        }
        drainer.join().unwrap()
    });

    taken.extend(stack.pop_all().iter().map(|n| n.val));
    assert_exact_partition(taken, ALL);
}
