#![no_main]

use libfuzzer_sys::fuzz_target;
use wfistack::{Node, Operation, Stack};

fuzz_target!(|ops: Vec<Operation<i32>>| {
    // One fresh node per operation; its index doubles as its identity.
    let nodes: Vec<Node<usize>> = (0..ops.len()).map(Node::new).collect();
    let stack = Stack::new();

    let len = ops.len();
    let chunk = std::cmp::max(len / 20, 1);

    let mut taken: Vec<usize> = std::thread::scope(|s| {
        let stack = &stack;
        let threads: Vec<_> = ops
            .chunks(chunk)
            .zip(nodes.chunks(chunk))
            .map(|(sub_ops, sub_nodes)| {
                s.spawn(move || {
                    let mut taken = vec![];
                    for (op, node) in sub_ops.iter().zip(sub_nodes) {
                        match op {
                            Operation::Push { .. } => stack.push(node),
                            Operation::PeekAndPush { .. } => {
                                stack.peek_and_push(node);
                            }
                            Operation::Pop => taken.extend(stack.pop().map(|n| n.val)),
                            Operation::PopAll => taken.extend(stack.pop_all().iter().map(|n| n.val)),
                            Operation::PopAllFifo => {
                                taken.extend(stack.pop_all_fifo().iter().map(|n| n.val))
                            }
                            Operation::ReplaceAll { .. } => {
                                taken.extend(stack.replace_all(node).iter().map(|n| n.val))
                            }
                            Operation::ReplaceAllFifo { .. } => {
                                taken.extend(stack.replace_all_fifo(node).iter().map(|n| n.val))
                            }
                            Operation::Peek => {
                                stack.peek();
                            }
                            Operation::Size => {
                                stack.size();
                            }
                            Operation::Iter => {
                                stack.iter().find(|n| n.val % 10214 == 0);
                            }
                        }
                    }
                    taken
                })
            })
            .collect();

        let mut taken = vec![];
        for thread in threads {
            taken.extend(thread.join().unwrap());
        }
        taken
    });

    taken.extend(stack.pop_all().iter().map(|n| n.val));
    taken.sort_unstable();

    let pushed: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| op.item().is_some())
        .map(|(i, _)| i)
        .collect();

    assert_eq!(taken, pushed);
});
