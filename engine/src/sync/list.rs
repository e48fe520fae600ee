//! A lock-free sorted singly-linked list.
//!
//! [`SortedList`] keeps its values ordered under a comparator supplied at insertion time and lets
//! any number of threads insert, remove and traverse concurrently without a mutex.
//!
//! # Deletion
//!
//! Removal happens in two steps. The node is first *marked* by setting the low tag bit of its own
//! `next` pointer, which freezes that pointer: no insertion can succeed after a marked node, and
//! traversals skip it. The node is then *unlinked* by swinging its predecessor's pointer past it.
//! If that second CAS loses a race the removal still counts; the next search that walks over the
//! marked node finishes the unlink.
//!
//! # Reclamation
//!
//! Unlinked nodes may still be referenced by a traversal that reached them before the unlink.
//! Every operation therefore runs under a [`crossbeam::epoch`] guard and only the thread whose CAS
//! unlinked a node defers its destruction, which runs once every guard that could observe the
//! node has been dropped.
//!
//! # Progress
//!
//! Insert and remove retry from the head of the list whenever a CAS fails. Some thread always
//! makes progress, but a single caller can in principle be starved under pathological contention.
//! Retries back off with [`Backoff`] rather than spinning flat out.

use std::{fmt, sync::atomic::Ordering};

use crossbeam::{
    epoch::{self, Atomic, Guard, Owned, Shared},
    utils::Backoff,
};
use log::trace;

/// Tag carried by a node's `next` pointer once the node is logically deleted.
const MARKED: usize = 1;

struct Node<T> {
    value: T,
    /// Successor, tagged with [`MARKED`] once this node is deleted.
    next: Atomic<Node<T>>,
}

/// Where a search stopped: the link that points at `curr`, and `curr` itself (null at the end).
struct Position<'g, T> {
    prev: &'g Atomic<Node<T>>,
    curr: Shared<'g, Node<T>>,
}

/// A concurrently mutable list whose values stay sorted under the insertion comparator.
///
/// Values are never mutated in place. Equal values keep insertion order: a new value lands after
/// every existing value it does not sort strictly before.
pub struct SortedList<T> {
    head: Atomic<Node<T>>,
}

impl<T: Send + Sync + 'static> SortedList<T> {
    /// Construct an empty list.
    pub fn new() -> Self {
        Self {
            head: Atomic::null(),
        }
    }

    /// Insert `value` in front of the first live value it sorts strictly before, where
    /// `less_than(a, b)` is true iff `a` sorts before `b`.
    pub fn insert<F>(&self, value: T, less_than: F)
    where
        F: Fn(&T, &T) -> bool,
    {
        let guard = &epoch::pin();
        let backoff = Backoff::new();
        let mut node = Owned::new(Node {
            value,
            next: Atomic::null(),
        });

        loop {
            let Position { prev, curr } =
                self.search(|existing| less_than(&node.value, existing), guard);
            node.next.store(curr, Ordering::Relaxed);

            match prev.compare_exchange(curr, node, Ordering::AcqRel, Ordering::Acquire, guard) {
                Ok(_) => return,
                Err(err) => {
                    trace!("sorted list insert lost a race, retrying");
                    node = err.new;
                    backoff.spin();
                }
            }
        }
    }

    /// Append `value` after every live value.
    pub fn push_back(&self, value: T) {
        self.insert(value, |_, _| false);
    }

    /// Append `value` unless a live value satisfies `is_duplicate`. Returns whether it was added.
    ///
    /// Appends all race on the same tail link, so two concurrent `push_back_unique` calls for
    /// duplicate values can never both succeed. Values placed with [`insert`](Self::insert) are
    /// not covered by that guarantee.
    pub fn push_back_unique<F>(&self, value: T, is_duplicate: F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        let guard = &epoch::pin();
        let backoff = Backoff::new();
        let mut node = Owned::new(Node {
            value,
            next: Atomic::null(),
        });

        loop {
            let Position { prev, curr } = self.search(&is_duplicate, guard);
            if !curr.is_null() {
                return false;
            }

            match prev.compare_exchange(curr, node, Ordering::AcqRel, Ordering::Acquire, guard) {
                Ok(_) => return true,
                Err(err) => {
                    trace!("sorted list append lost a race, retrying");
                    node = err.new;
                    backoff.spin();
                }
            }
        }
    }

    /// Delete the first live value matching `matches`. Returns `false` if there is none.
    ///
    /// The delete is complete once the value is marked; unlinking may be left to a later
    /// operation.
    pub fn remove_first<F>(&self, mut matches: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        let guard = &epoch::pin();
        let backoff = Backoff::new();

        loop {
            let Position { prev, curr } = self.search(&mut matches, guard);
            // SAFETY: `curr` was loaded under `guard` and cannot be reclaimed before it drops.
            let Some(node) = (unsafe { curr.as_ref() }) else {
                return false;
            };

            let next = node.next.load(Ordering::Acquire, guard);
            if next.tag() == MARKED {
                // Someone else deleted it first; look again.
                backoff.spin();
                continue;
            }
            if node
                .next
                .compare_exchange(
                    next,
                    next.with_tag(MARKED),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                    guard,
                )
                .is_err()
            {
                backoff.spin();
                continue;
            }

            match prev.compare_exchange(curr, next, Ordering::AcqRel, Ordering::Acquire, guard) {
                // SAFETY: the node is no longer reachable from the list and we unlinked it.
                Ok(_) => unsafe { guard.defer_destroy(curr) },
                Err(_) => trace!("left marked node for a later unlink"),
            }
            return true;
        }
    }

    /// Whether a live value matches `pred`.
    pub fn contains<F>(&self, pred: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        let guard = &epoch::pin();
        self.iter(guard).any(pred)
    }

    /// Whether the list holds no live value.
    pub fn is_empty(&self) -> bool {
        let guard = &epoch::pin();
        self.iter(guard).next().is_none()
    }

    /// Lazily traverse live values in list order.
    ///
    /// The iterator sees every value that stays in the list for the whole traversal and may or
    /// may not see values inserted or removed while it runs.
    pub fn iter<'g>(&'g self, guard: &'g Guard) -> Iter<'g, T> {
        Iter {
            curr: self.head.load(Ordering::Acquire, guard),
            guard,
        }
    }

    /// Visit live values in ascending order until `visit` returns `false`.
    pub fn range<F>(&self, mut visit: F)
    where
        F: FnMut(&T) -> bool,
    {
        let guard = &epoch::pin();
        for value in self.iter(guard) {
            if !visit(value) {
                break;
            }
        }
    }

    /// Visit live values in descending order until `visit` returns `false`.
    ///
    /// There are no back pointers, so the forward traversal is buffered first.
    pub fn range_reverse<F>(&self, mut visit: F)
    where
        F: FnMut(&T) -> bool,
    {
        let guard = &epoch::pin();
        let values: Vec<&T> = self.iter(guard).collect();
        for value in values.into_iter().rev() {
            if !visit(value) {
                break;
            }
        }
    }

    /// Find the first live node whose value satisfies `stop`, unlinking marked nodes on the way.
    /// Returns the null position at the end of the list if nothing matches.
    fn search<'g, F>(&'g self, mut stop: F, guard: &'g Guard) -> Position<'g, T>
    where
        F: FnMut(&T) -> bool,
    {
        let backoff = Backoff::new();

        'retry: loop {
            let mut prev = &self.head;
            let mut curr = prev.load(Ordering::Acquire, guard);

            // SAFETY: every node reached here was loaded under `guard`.
            while let Some(node) = unsafe { curr.as_ref() } {
                let next = node.next.load(Ordering::Acquire, guard);

                if next.tag() == MARKED {
                    let next = next.with_tag(0);
                    match prev.compare_exchange(
                        curr,
                        next,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                        guard,
                    ) {
                        Ok(_) => {
                            // SAFETY: unlinked by this thread's CAS.
                            unsafe { guard.defer_destroy(curr) };
                            curr = next;
                            continue;
                        }
                        Err(_) => {
                            // `prev` changed or was itself marked.
                            backoff.spin();
                            continue 'retry;
                        }
                    }
                }

                if stop(&node.value) {
                    return Position { prev, curr };
                }
                prev = &node.next;
                curr = next;
            }

            return Position { prev, curr };
        }
    }
}

impl<T: Send + Sync + 'static + PartialEq> SortedList<T> {
    /// Delete the first live value equal to `value`.
    pub fn remove(&self, value: &T) -> bool {
        self.remove_first(|v| v == value)
    }
}

impl<T: Send + Sync + 'static> Default for SortedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static + fmt::Debug> fmt::Debug for SortedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = &epoch::pin();
        f.debug_list().entries(self.iter(guard)).finish()
    }
}

impl<T> Drop for SortedList<T> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no other thread can reach these nodes. Nodes that were
        // unlinked are owned by the collector, and everything still linked (marked or not) is
        // freed here exactly once.
        unsafe {
            let guard = epoch::unprotected();
            let mut curr = self.head.load(Ordering::Relaxed, guard);
            while let Some(node) = curr.as_ref() {
                let next = node.next.load(Ordering::Relaxed, guard);
                drop(curr.into_owned());
                curr = next.with_tag(0);
            }
        }
    }
}

/// Iterator over the live values of a [`SortedList`], valid while its guard is held.
pub struct Iter<'g, T> {
    curr: Shared<'g, Node<T>>,
    guard: &'g Guard,
}

impl<'g, T> Iterator for Iter<'g, T> {
    type Item = &'g T;

    fn next(&mut self) -> Option<&'g T> {
        loop {
            // SAFETY: nodes reachable under `guard` outlive it.
            let node = unsafe { self.curr.as_ref() }?;
            let next = node.next.load(Ordering::Acquire, self.guard);
            self.curr = next.with_tag(0);
            if next.tag() != MARKED {
                return Some(&node.value);
            }
        }
    }
}
