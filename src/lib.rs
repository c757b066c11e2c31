//! A wait-free intrusive stack.
//!
//! Producers never block: [`Stack::push`] is a single atomic exchange. Bulk
//! removal is equally cheap, [`Stack::pop_all`] swaps the whole chain out at
//! once and hands it back as a [`Lifo`] view, or as a [`Fifo`] view after a
//! one-time in-place reversal. Single [`Stack::pop`] is lock-free.
//!
//! Entries embed [`Links`] and implement [`Linked`], usually through the
//! [`linked!`] macro, or use the ready-made [`Node`]. The stack borrows its
//! entries and never frees them.
//!
//! ```
//! use wfistack::{Node, Stack};
//!
//! let nodes: Vec<Node<u32>> = (0..3).map(Node::new).collect();
//! let stack = Stack::new();
//! nodes.iter().for_each(|n| stack.push(n));
//!
//! let oldest_first: Vec<u32> = stack.pop_all_fifo().iter().map(|n| n.val).collect();
//! assert_eq!(oldest_first, [0, 1, 2]);
//! ```

#[cfg(not(target_has_atomic = "ptr"))]
compile_error!("wfistack requires atomic pointer exchange and compare-and-swap on the target");

macro_rules! trace {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!($($arg)+);
    };
}

mod base;
mod links;
mod loom;
mod snapshot;

pub use base::{Iter, Stack};
pub use links::{Linked, Links, Node};
pub use snapshot::{Fifo, Lifo};

#[cfg(feature = "arbitrary")]
#[derive(Clone, Debug)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Operation<T> {
    Push { item: T },
    PeekAndPush { item: T },
    Pop,
    PopAll,
    PopAllFifo,
    ReplaceAll { item: T },
    ReplaceAllFifo { item: T },
    Peek,
    Size,
    Iter,
}

#[cfg(feature = "arbitrary")]
impl<T> Operation<T> {
    /// The value this operation pushes, if it pushes a node.
    pub fn item(&self) -> Option<&T> {
        match self {
            Operation::Push { item }
            | Operation::PeekAndPush { item }
            | Operation::ReplaceAll { item }
            | Operation::ReplaceAllFifo { item } => Some(item),
            _ => None,
        }
    }
}
