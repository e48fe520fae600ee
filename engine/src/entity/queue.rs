use std::collections::VecDeque;

/// A double-ended queue of recycled values.
///
/// The entity [`Allocator`](super::Allocator) only uses it first-in first-out (`push_back` +
/// `pop_front`), but both ends are open for other callers. Every push and pop is amortized
/// O(1). Reading from an empty queue yields `None` rather than panicking.
#[derive(Debug, Clone)]
pub struct RecycleQueue<T> {
    items: VecDeque<T>,
}

impl<T> RecycleQueue<T> {
    /// Construct an empty queue.
    pub const fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Construct an empty queue with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The oldest item, next in line for `pop_front`.
    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    /// The newest item.
    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn push_back(&mut self, value: T) {
        self.items.push_back(value);
    }

    pub fn push_front(&mut self, value: T) {
        self.items.push_front(value);
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn pop_back(&mut self) -> Option<T> {
        self.items.pop_back()
    }

    /// Remove every item, keeping the allocation.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Reserve room for at least `additional` more items.
    pub fn reserve(&mut self, additional: usize) {
        self.items.reserve(additional);
    }

    /// Iterate from front to back.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T> Default for RecycleQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for RecycleQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[test]
fn queue_is_fifo_through_back_and_front() {
    // Given
    let mut queue = RecycleQueue::new();

    // When
    for i in 1..=3 {
        queue.push_back(i);
    }

    // Then
    assert_eq!(queue.len(), 3);
    assert_eq!(queue.front(), Some(&1));
    assert_eq!(queue.back(), Some(&3));
    assert_eq!(queue.pop_front(), Some(1));
    assert_eq!(queue.pop_front(), Some(2));
    assert_eq!(queue.pop_front(), Some(3));
    assert_eq!(queue.pop_front(), None);
}

#[test]
fn queue_supports_both_ends() {
    // Given
    let mut queue: RecycleQueue<u32> = [2, 3].into_iter().collect();

    // When
    queue.push_front(1);
    queue.push_back(4);

    // Then
    assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert_eq!(queue.pop_back(), Some(4));
    assert_eq!(queue.pop_front(), Some(1));
    assert_eq!(queue.len(), 2);
}

#[test]
fn empty_queue_reads_none() {
    let mut queue = RecycleQueue::<u32>::with_capacity(8);

    assert!(queue.is_empty());
    assert_eq!(queue.front(), None);
    assert_eq!(queue.back(), None);
    assert_eq!(queue.pop_back(), None);
    assert_eq!(queue.pop_front(), None);
}

#[test]
fn clear_empties_queue() {
    let mut queue: RecycleQueue<u32> = (0..10).collect();

    queue.clear();

    assert!(queue.is_empty());
}
