#![no_main]

use libfuzzer_sys::fuzz_target;
use wfistack::{Iter, Node, Operation, Stack};

fn vals(iter: Iter<'_, Node<i32>>) -> Vec<i32> {
    iter.map(|n| n.val).collect()
}

fuzz_target!(|ops: Vec<Operation<i32>>| {
    let nodes: Vec<Node<i32>> = ops
        .iter()
        .map(|op| Node::new(op.item().copied().unwrap_or_default()))
        .collect();
    let stack = Stack::new();
    let mut model: Vec<i32> = vec![];

    for (op, node) in ops.iter().zip(&nodes) {
        match op {
            Operation::Push { item } => {
                stack.push(node);
                model.push(*item);
            }
            Operation::PeekAndPush { item } => {
                assert_eq!(stack.peek_and_push(node).map(|n| n.val), model.last().copied());
                model.push(*item);
            }
            Operation::Pop => assert_eq!(stack.pop().map(|n| n.val), model.pop()),
            Operation::PopAll => {
                let expected: Vec<i32> = model.drain(..).rev().collect();
                assert_eq!(vals(stack.pop_all().iter()), expected);
            }
            Operation::PopAllFifo => {
                let expected: Vec<i32> = model.drain(..).collect();
                assert_eq!(vals(stack.pop_all_fifo().iter()), expected);
            }
            Operation::ReplaceAll { item } => {
                let expected: Vec<i32> = model.drain(..).rev().collect();
                assert_eq!(vals(stack.replace_all(node).iter()), expected);
                model.push(*item);
            }
            Operation::ReplaceAllFifo { item } => {
                let expected: Vec<i32> = model.drain(..).collect();
                assert_eq!(vals(stack.replace_all_fifo(node).iter()), expected);
                model.push(*item);
            }
            Operation::Peek => assert_eq!(stack.peek().map(|n| n.val), model.last().copied()),
            Operation::Size => assert_eq!(stack.size(), model.len()),
            Operation::Iter => {
                let expected: Vec<i32> = model.iter().rev().copied().collect();
                assert_eq!(vals(stack.iter()), expected);
            }
        }
    }
});
