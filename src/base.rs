use crate::links::{end, is_end, Linked, Links};
use crate::snapshot::{Fifo, Lifo};
use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;
use crate::loom::{AtomicPtr, Backoff};
use core::sync::atomic::Ordering;
use crossbeam_utils::CachePadded;

/// A wait-free intrusive LIFO stack.
///
/// `push`, `peek_and_push`, `pop_all` and `replace_all` are wait-free, each a
/// single atomic exchange on the head. `pop` is lock-free: it retries a
/// compare-and-swap under contention.
///
/// Nodes are borrowed for `'a` and never freed by the stack. A node may be
/// pushed only once in its lifetime, even after it has been popped.
pub struct Stack<'a, T: Linked> {
    head: CachePadded<AtomicPtr<Links>>,
    _nodes: PhantomData<&'a T>,
}

impl<'a, T: Linked> Stack<'a, T> {
    #[must_use]
    pub fn new() -> Self {
        Stack {
            head: CachePadded::new(AtomicPtr::new(end().as_ptr())),
            _nodes: PhantomData,
        }
    }

    /// Returns the number of nodes on the stack.
    ///
    /// This is racy: the count can be stale as soon as it is returned.
    pub fn size(&self) -> usize {
        let head = self.load_head();
        let links = unsafe { head.as_ref() };
        links.wait_next();
        links.position()
    }

    /// Returns `true` if the stack held no nodes when the head was read.
    pub fn is_empty(&self) -> bool {
        is_end(self.load_head())
    }

    /// Returns the most recently pushed node without removing it.
    ///
    /// This is racy: the node may already have been popped.
    pub fn peek(&self) -> Option<&'a T> {
        unsafe { node_of(self.load_head()) }
    }

    /// Pushes `node` onto the stack.
    ///
    /// Wait-free and *O*(1).
    pub fn push(&self, node: &'a T) {
        self.publish(node);
    }

    /// Pushes `node` and returns the node it displaced, which stays on the
    /// stack underneath it.
    ///
    /// Wait-free and *O*(1).
    pub fn peek_and_push(&self, node: &'a T) -> Option<&'a T> {
        let prev = self.publish(node);
        unsafe { node_of(prev) }
    }

    /// Removes the most recently pushed node.
    ///
    /// Lock-free but not wait-free: a compare-and-swap is retried while other
    /// threads are changing the head.
    pub fn pop(&self) -> Option<&'a T> {
        let backoff = Backoff::new();
        loop {
            let candidate = self.load_head();
            if is_end(candidate) {
                trace!("Stack::pop -> empty");
                return None;
            }

            let successor = unsafe { candidate.as_ref() }.wait_next();

            match self.head.compare_exchange_weak(
                candidate.as_ptr(),
                successor.as_ptr(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    trace!(?candidate, ?successor, "Stack::pop -> popped");
                    return unsafe { node_of(candidate) };
                }
                Err(_) => backoff.spin(),
            }
        }
    }

    /// Atomically takes every node on the stack, most recent first.
    ///
    /// Wait-free and *O*(1). Racing callers never receive overlapping nodes.
    pub fn pop_all(&self) -> Lifo<'a, T> {
        let prev = self.swap_head(end());
        trace!(?prev, "Stack::pop_all");
        unsafe { Lifo::from_head(prev) }
    }

    /// Atomically takes every node on the stack, oldest first.
    ///
    /// Wait-free, *O*(n) in the number of nodes taken.
    pub fn pop_all_fifo(&self) -> Fifo<'a, T> {
        self.pop_all().into_fifo()
    }

    /// Atomically replaces the whole stack with `node`, returning what was
    /// there before, most recent first.
    ///
    /// Wait-free and *O*(1).
    pub fn replace_all(&self, node: &'a T) -> Lifo<'a, T> {
        let links = node.links();
        debug_assert!(!links.is_linked(), "stack nodes cannot be reused");
        links.publish(end(), 1);

        let prev = self.swap_head(NonNull::from(links));
        trace!(?prev, node = ?NonNull::from(links), "Stack::replace_all");
        unsafe { Lifo::from_head(prev) }
    }

    /// Like [`Stack::replace_all`], but the displaced nodes come oldest first.
    ///
    /// Wait-free, *O*(n) in the number of nodes displaced.
    pub fn replace_all_fifo(&self, node: &'a T) -> Fifo<'a, T> {
        self.replace_all(node).into_fifo()
    }

    /// Walks the stack from the current head.
    ///
    /// This is not a snapshot: nodes popped concurrently may or may not be
    /// yielded, and a node can come up twice if a FIFO drain reverses the
    /// chain underneath the walk. The walk always ends. Use
    /// [`Stack::pop_all`] for an atomic view.
    pub fn iter(&self) -> Iter<'a, T> {
        Iter::starting_at(self.load_head())
    }

    fn publish(&self, node: &'a T) -> NonNull<Links> {
        let links = node.links();
        debug_assert!(!links.is_linked(), "stack nodes cannot be reused");

        let prev = self.swap_head(NonNull::from(links));
        // `position` of `prev` may still be in flight; reading it without
        // waiting keeps the push wait-free.
        let position = unsafe { prev.as_ref() }.position() + 1;
        links.publish(prev, position);

        trace!(node = ?NonNull::from(links), ?prev, position, "Stack::push");
        prev
    }

    #[inline]
    fn swap_head(&self, new: NonNull<Links>) -> NonNull<Links> {
        let prev = self.head.swap(new.as_ptr(), Ordering::AcqRel);
        unsafe { NonNull::new_unchecked(prev) }
    }

    #[inline]
    fn load_head(&self) -> NonNull<Links> {
        unsafe { NonNull::new_unchecked(self.head.load(Ordering::Acquire)) }
    }
}

impl<'a, T: Linked> Default for Stack<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: Linked> fmt::Debug for Stack<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("head", &self.head.load(Ordering::Relaxed))
            .finish()
    }
}

impl<'s, 'a, T: Linked> IntoIterator for &'s Stack<'a, T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

/// Maps a link pointer back to its node, or `None` for the end marker.
///
/// # Safety
///
/// `links` must be the end marker or belong to a `T` that lives for `'a`.
#[inline]
pub(crate) unsafe fn node_of<'a, T: Linked>(links: NonNull<Links>) -> Option<&'a T> {
    if is_end(links) {
        None
    } else {
        Some(T::from_links(links).as_ref())
    }
}

/// An iterator over stack nodes.
///
/// Returned by [`Stack::iter`] for a live walk, and by the snapshot views.
pub struct Iter<'a, T: Linked> {
    next: NonNull<Links>,
    _nodes: PhantomData<&'a T>,
}

impl<'a, T: Linked> Iter<'a, T> {
    pub(crate) fn starting_at(next: NonNull<Links>) -> Self {
        Iter {
            next,
            _nodes: PhantomData,
        }
    }
}

unsafe impl<'a, T: Linked + Sync> Send for Iter<'a, T> {}
unsafe impl<'a, T: Linked + Sync> Sync for Iter<'a, T> {}

impl<'a, T: Linked> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node: &'a T = unsafe { node_of(self.next)? };
        self.next = node.links().wait_next();
        Some(node)
    }
}

impl<'a, T: Linked> core::iter::FusedIterator for Iter<'a, T> {}

impl<'a, T: Linked> fmt::Debug for Iter<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").field("next", &self.next).finish()
    }
}
