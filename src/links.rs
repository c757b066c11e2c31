use core::fmt;
use core::marker::PhantomPinned;
use core::ptr::{self, NonNull};
use crate::loom::{AtomicPtr, AtomicUsize, Backoff};
use core::sync::atomic::Ordering;

/// The intrusive links every [`Stack`](crate::Stack) entry embeds.
///
/// `next` is written exactly once by the pushing thread, after `position`.
/// Readers must go through [`Links::wait_next`], which spins until the
/// release store of `next` is visible, after which `position` is final too.
pub struct Links {
    next: AtomicPtr<Links>,
    position: AtomicUsize,
    _unpin: PhantomPinned,
}

/// The empty marker. Its `next` points at itself so traversals never branch
/// on null; it is never handed out to callers.
#[cfg(not(loom))]
static END: Links = Links {
    next: AtomicPtr::new(ptr::addr_of!(END) as *mut Links),
    position: AtomicUsize::new(0),
    _unpin: PhantomPinned,
};

#[cfg(loom)]
loom::lazy_static! {
    static ref END: Links = Links::new();
}

#[cfg(not(loom))]
#[inline]
pub(crate) fn end() -> NonNull<Links> {
    NonNull::from(&END)
}

#[cfg(loom)]
pub(crate) fn end() -> NonNull<Links> {
    let end: &'static Links = &END;
    let this = end as *const Links as *mut Links;
    // A lazily built marker cannot name itself, so it is closed on first use.
    let _ = end
        .next
        .compare_exchange(ptr::null_mut(), this, Ordering::Release, Ordering::Relaxed);
    NonNull::from(end)
}

#[inline]
pub(crate) fn is_end(links: NonNull<Links>) -> bool {
    let end: &Links = &END;
    ptr::eq(links.as_ptr(), end)
}

impl Links {
    /// Returns fresh, unpublished links.
    #[cfg(not(loom))]
    #[must_use]
    pub const fn new() -> Self {
        Links {
            next: AtomicPtr::new(ptr::null_mut()),
            position: AtomicUsize::new(0),
            _unpin: PhantomPinned,
        }
    }

    /// Returns fresh, unpublished links.
    #[cfg(loom)]
    #[must_use]
    pub fn new() -> Self {
        Links {
            next: AtomicPtr::new(ptr::null_mut()),
            position: AtomicUsize::new(0),
            _unpin: PhantomPinned,
        }
    }

    /// Returns `true` once the owning node has been pushed onto a stack.
    ///
    /// Nodes cannot be pushed a second time, even after they have been popped.
    pub fn is_linked(&self) -> bool {
        !self.next.load(Ordering::Acquire).is_null()
    }

    /// Writes `position`, then publishes `next`. The release store pairs with
    /// the acquire load in `wait_next`.
    #[inline]
    pub(crate) fn publish(&self, next: NonNull<Links>, position: usize) {
        self.position.store(position, Ordering::Relaxed);
        self.next.store(next.as_ptr(), Ordering::Release);
    }

    /// Rewrites `next` of a node on a detached chain.
    #[inline]
    pub(crate) fn relink(&self, next: NonNull<Links>) {
        self.next.store(next.as_ptr(), Ordering::Release);
    }

    /// Spins until the pushing thread has published `next`.
    ///
    /// The wait is bounded by a single writer finishing its two stores, never
    /// by the amount of contention on the stack.
    pub(crate) fn wait_next(&self) -> NonNull<Links> {
        let backoff = Backoff::new();
        loop {
            if let Some(next) = NonNull::new(self.next.load(Ordering::Acquire)) {
                return next;
            }
            backoff.snooze();
        }
    }

    /// Only meaningful after `wait_next` has returned for this node.
    #[inline]
    pub(crate) fn position(&self) -> usize {
        self.position.load(Ordering::Relaxed)
    }
}

impl Default for Links {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Links {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("next", &self.next.load(Ordering::Relaxed))
            .field("position", &self.position.load(Ordering::Relaxed))
            .finish()
    }
}

/// A type that can live on a [`Stack`](crate::Stack).
///
/// # Safety
///
/// `links` must always return the same `Links` embedded in `self`, and
/// `from_links` must invert it: given a pointer produced from `links`, it
/// must return a pointer to the node that contains those links. The
/// [`linked!`](crate::linked) macro implements both correctly.
pub unsafe trait Linked: Sized {
    /// Borrows the links embedded in this node.
    fn links(&self) -> &Links;

    /// Recovers the node that embeds `links`.
    ///
    /// # Safety
    ///
    /// `links` must have been obtained from [`Linked::links`] on a live
    /// value of `Self`.
    unsafe fn from_links(links: NonNull<Links>) -> NonNull<Self>;
}

/// Implements [`Linked`] for a struct with a [`Links`] field.
///
/// Generic structs list their type parameters first, as in
/// `linked!(impl<T> Job<T>, links)`. Bounds and lifetime parameters are not
/// accepted; implement [`Linked`] by hand for those.
///
/// ```
/// use wfistack::{linked, Links, Stack};
///
/// struct Task {
///     links: Links,
///     id: u32,
/// }
///
/// linked!(Task, links);
///
/// let a = Task { links: Links::new(), id: 7 };
/// let stack = Stack::new();
/// stack.push(&a);
/// assert_eq!(stack.pop().map(|t| t.id), Some(7));
/// ```
#[macro_export]
macro_rules! linked {
    (impl<$($g:ident),* $(,)?> $ty:ty, $field:ident) => {
        unsafe impl<$($g),*> $crate::Linked for $ty {
            #[inline]
            fn links(&self) -> &$crate::Links {
                &self.$field
            }

            #[inline]
            unsafe fn from_links(
                links: ::core::ptr::NonNull<$crate::Links>,
            ) -> ::core::ptr::NonNull<Self> {
                let offset = ::core::mem::offset_of!($ty, $field);
                ::core::ptr::NonNull::new_unchecked(
                    links.as_ptr().cast::<u8>().sub(offset).cast::<$ty>(),
                )
            }
        }
    };
    ($ty:ty, $field:ident) => {
        $crate::linked!(impl<> $ty, $field);
    };
}

/// A ready-made stack entry wrapping a value.
pub struct Node<V> {
    links: Links,
    pub val: V,
}

crate::linked!(impl<V> Node<V>, links);

impl<V> Node<V> {
    #[cfg(not(loom))]
    pub const fn new(val: V) -> Self {
        Node {
            links: Links::new(),
            val,
        }
    }

    #[cfg(loom)]
    pub fn new(val: V) -> Self {
        Node {
            links: Links::new(),
            val,
        }
    }

    pub fn into_inner(self) -> V {
        self.val
    }

    /// See [`Links::is_linked`].
    pub fn is_linked(&self) -> bool {
        self.links.is_linked()
    }
}

impl<V> core::ops::Deref for Node<V> {
    type Target = V;
    fn deref(&self) -> &V {
        &self.val
    }
}

impl<V: fmt::Debug> fmt::Debug for Node<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("val", &self.val)
            .field("links", &self.links)
            .finish()
    }
}
