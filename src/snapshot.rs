//! Detached chains returned by the bulk operations of [`Stack`](crate::Stack).
//!
//! A chain is cut out of the stack by a single exchange on the head, so no
//! other thread can link into or out of it afterwards. Both views can be
//! iterated any number of times and always yield the same nodes.

use crate::base::Iter;
use crate::links::{end, is_end, Linked, Links};
use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

/// Nodes taken from a stack, most recently pushed first.
pub struct Lifo<'a, T: Linked> {
    head: NonNull<Links>,
    _nodes: PhantomData<&'a T>,
}

/// Nodes taken from a stack, oldest first.
///
/// Only obtainable through [`Lifo::into_fifo`], so a chain is reversed at
/// most once.
pub struct Fifo<'a, T: Linked> {
    head: NonNull<Links>,
    _nodes: PhantomData<&'a T>,
}

impl<'a, T: Linked> Lifo<'a, T> {
    /// # Safety
    ///
    /// `head` must be the end marker or the top of a chain of `T`s living for
    /// `'a` that has been detached from its stack.
    pub(crate) unsafe fn from_head(head: NonNull<Links>) -> Self {
        Lifo {
            head,
            _nodes: PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool {
        is_end(self.head)
    }

    pub fn iter(&self) -> Iter<'a, T> {
        Iter::starting_at(self.head)
    }

    /// Reverses the chain in place.
    ///
    /// Linear in the number of nodes. Nodes whose push is still completing
    /// are waited for, so the result always holds every node that was taken.
    pub fn into_fifo(self) -> Fifo<'a, T> {
        let mut reversed = end();
        let mut rest = self.head;

        while !is_end(rest) {
            let links = unsafe { rest.as_ref() };
            rest = links.wait_next();
            links.relink(reversed);
            reversed = NonNull::from(links);
        }

        trace!(head = ?reversed, "Lifo::into_fifo");
        Fifo {
            head: reversed,
            _nodes: PhantomData,
        }
    }
}

impl<'a, T: Linked> Fifo<'a, T> {
    pub fn is_empty(&self) -> bool {
        is_end(self.head)
    }

    pub fn iter(&self) -> Iter<'a, T> {
        Iter::starting_at(self.head)
    }
}

unsafe impl<'a, T: Linked + Sync> Send for Lifo<'a, T> {}
unsafe impl<'a, T: Linked + Sync> Sync for Lifo<'a, T> {}
unsafe impl<'a, T: Linked + Sync> Send for Fifo<'a, T> {}
unsafe impl<'a, T: Linked + Sync> Sync for Fifo<'a, T> {}

macro_rules! view_impls {
    ($view:ident) => {
        impl<'a, T: Linked> IntoIterator for $view<'a, T> {
            type Item = &'a T;
            type IntoIter = Iter<'a, T>;

            fn into_iter(self) -> Iter<'a, T> {
                self.iter()
            }
        }

        impl<'v, 'a, T: Linked> IntoIterator for &'v $view<'a, T> {
            type Item = &'a T;
            type IntoIter = Iter<'a, T>;

            fn into_iter(self) -> Iter<'a, T> {
                self.iter()
            }
        }

        impl<'a, T: Linked> fmt::Debug for $view<'a, T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($view))
                    .field("head", &self.head)
                    .finish()
            }
        }
    };
}

view_impls!(Lifo);
view_impls!(Fifo);
