//! Entity identifiers and their allocation.
//!
//! Entities are compact 32-bit handles. The low 24 bits identify a storage slot ([`Index`]) and
//! the high 8 bits count how many times that slot has been recycled ([`Generation`]). A stale
//! handle for a recycled slot carries an older generation, which is how [`Allocator::is_alive`]
//! tells it apart from the handle currently occupying the slot.
//!
//! # Reuse Threshold
//!
//! Eight bits of generation only distinguish 256 reuses of the same slot. To keep a freed slot
//! from coming straight back, the [`Allocator`] parks freed indices in a FIFO [`RecycleQueue`]
//! and only draws from it once at least [`Allocator::MIN_FREE_INDICES`] indices are waiting.
//! A slot must therefore run 256 laps through a queue of at least 1024 entries, roughly 262,144
//! alloc/free cycles, before one of its ids can reappear:
//!
//! ```rust,ignore
//! let mut allocator = Allocator::new();
//! let a = allocator.alloc();      // Entity{1,0}
//! allocator.free(a);
//! let b = allocator.alloc();      // Entity{2,0}, slot 1 is still parked
//! assert!(!allocator.is_alive(a));
//! ```
//!
//! # Thread Safety
//!
//! The allocator has no internal synchronization. Every mutating operation takes `&mut self`, so
//! the borrow checker keeps it with a single owner (normally the world's simulation thread). Wrap
//! it in a lock if several threads must allocate.

pub mod queue;

use std::fmt;

use log::trace;

pub use queue::RecycleQueue;

/// Number of bits of an [`EntityId`] used for the generation.
pub const GENERATION_BITS: u32 = 8;

/// Number of bits of an [`EntityId`] used for the slot index.
pub const INDEX_BITS: u32 = u32::BITS - GENERATION_BITS;

const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;
const GENERATION_MASK: u32 = (1 << GENERATION_BITS) - 1;

/// The storage slot of an entity. Only the low 24 bits are ever used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Index(u32);

impl Index {
    /// The largest index an [`EntityId`] can encode.
    pub const MAX: Self = Self(INDEX_MASK);

    /// The raw slot number.
    #[inline]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Position of this slot in indexable storage (e.g. Vec).
    #[inline]
    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Index {
    /// Build an index, discarding anything above the 24 index bits.
    fn from(value: u32) -> Self {
        Self(value & INDEX_MASK)
    }
}

/// The generation of a slot. Incremented (wrapping at 256) every time the slot is freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u8);

impl Generation {
    /// The generation of a freshly created slot.
    pub const FIRST: Self = Self(0);

    /// The generation after this one. Wraps silently from 255 back to 0.
    #[inline]
    pub const fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// The raw generation counter.
    #[inline]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

impl From<u8> for Generation {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

/// A packed `(index, generation)` entity handle.
///
/// The all-zero value is [`EntityId::NIL`]; it is never issued because slot 0 is reserved.
/// Ordering is by the packed value, so ids sharing a generation sort by index.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntityId(u32);

impl EntityId {
    /// The reserved nil identifier.
    pub const NIL: Self = Self(0);

    /// Pack an index and generation into an id.
    #[inline]
    pub const fn new(index: Index, generation: Generation) -> Self {
        Self(((generation.0 as u32) << INDEX_BITS) | (index.0 & INDEX_MASK))
    }

    /// Rebuild an id from its packed form, e.g. after a round trip through a host.
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The packed 32-bit value.
    #[inline]
    pub const fn to_bits(&self) -> u32 {
        self.0
    }

    /// The slot this id refers to.
    #[inline]
    pub const fn index(&self) -> Index {
        Index(self.0 & INDEX_MASK)
    }

    /// The generation of the slot at the time this id was issued.
    #[inline]
    pub const fn generation(&self) -> Generation {
        Generation(((self.0 >> INDEX_BITS) & GENERATION_MASK) as u8)
    }

    /// Whether this is the nil identifier.
    #[inline]
    pub const fn is_nil(&self) -> bool {
        self.0 == 0
    }
}

impl From<EntityId> for u32 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl fmt::Display for EntityId {
    /// Hexadecimal rendering of the packed value, e.g. `Entity#1000002`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity#{:X}", self.0)
    }
}

impl fmt::Debug for EntityId {
    /// Structured rendering, e.g. `Entity{2,1}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity{{{},{}}}", self.index().0, self.generation().0)
    }
}

/// Issues and invalidates [`EntityId`]s.
///
/// Owns one generation byte per slot (slot 0 backs [`EntityId::NIL`] and is never handed out)
/// and a [`RecycleQueue`] of freed slots. The generation table only grows.
#[derive(Debug, Clone)]
pub struct Allocator {
    /// Current generation of every slot, indexed by slot number.
    generations: Vec<Generation>,

    /// Freed slots waiting to be reused, oldest first.
    free_indices: RecycleQueue<Index>,

    /// Number of parked slots required before any of them is reused.
    min_free_indices: usize,
}

impl Allocator {
    /// Default number of freed slots that must be pending before a slot is reused.
    pub const MIN_FREE_INDICES: usize = 1024;

    /// Construct an allocator with the default reuse threshold.
    pub fn new() -> Self {
        Self::with_min_free_indices(Self::MIN_FREE_INDICES)
    }

    /// Construct an allocator that reuses slots once `min_free_indices` of them are parked.
    ///
    /// Lower thresholds shrink the number of alloc/free cycles needed before a stale id can be
    /// mistaken for a live one. A threshold of zero reuses a slot as soon as it is freed.
    pub fn with_min_free_indices(min_free_indices: usize) -> Self {
        let mut allocator = Self {
            generations: Vec::new(),
            free_indices: RecycleQueue::new(),
            min_free_indices,
        };
        allocator.reset();
        allocator
    }

    /// Forget every issued id and start over from slot 1.
    ///
    /// Storage for the threshold's worth of slots is reserved up front since at least that many
    /// will be created before the first reuse.
    pub fn reset(&mut self) {
        self.generations.clear();
        self.generations.reserve(self.min_free_indices + 1);
        // Slot 0 backs the nil id.
        self.generations.push(Generation::FIRST);
        self.free_indices.clear();
        self.free_indices.reserve(self.min_free_indices + 1);
    }

    /// Allocate an id, reusing the oldest freed slot once enough of them are pending, or creating
    /// a new slot otherwise.
    ///
    /// Exhausting the 24-bit index space is not guarded against in release builds.
    pub fn alloc(&mut self) -> EntityId {
        if self.free_indices.len() >= self.min_free_indices
            && let Some(index) = self.free_indices.pop_front()
        {
            // Freeing already advanced the generation.
            trace!("reusing entity slot {}", index.0);
            return EntityId::new(index, self.generations[index.as_usize()]);
        }

        let index = Index(self.generations.len() as u32);
        debug_assert!(index <= Index::MAX, "entity index space exhausted");
        self.generations.push(Generation::FIRST);
        EntityId::new(index, Generation::FIRST)
    }

    /// Allocate `count` ids at once under the same reuse rules as [`alloc`](Self::alloc).
    pub fn alloc_many(&mut self, count: usize) -> Vec<EntityId> {
        let mut alloced = Vec::with_capacity(count);
        // Reuse only the slots above the threshold; each pop must leave the queue allowed to pop.
        let reusable = (self.free_indices.len() + 1).saturating_sub(self.min_free_indices);
        let reused = reusable.min(count);
        for _ in 0..reused {
            if let Some(index) = self.free_indices.pop_front() {
                alloced.push(EntityId::new(index, self.generations[index.as_usize()]));
            }
        }

        let start = self.generations.len();
        let remaining = count - alloced.len();
        debug_assert!(
            start + remaining <= Index::MAX.as_usize() + 1,
            "entity index space exhausted"
        );
        self.generations
            .extend(std::iter::repeat_n(Generation::FIRST, remaining));
        alloced.extend(
            (start..start + remaining).map(|i| EntityId::new(Index(i as u32), Generation::FIRST)),
        );
        alloced
    }

    /// Invalidate `id` and park its slot for later reuse.
    ///
    /// `id` must currently be alive. Freeing a dead, nil or foreign id is a logic error: it trips
    /// an assertion in debug builds and corrupts the generation table in release builds.
    pub fn free(&mut self, id: EntityId) {
        debug_assert!(self.is_alive(id), "freed an entity that is not alive: {id:?}");
        let index = id.index();
        let generation = &mut self.generations[index.as_usize()];
        *generation = generation.next();
        self.free_indices.push_back(index);
    }

    /// Whether `id` is non-nil and still the current occupant of its slot.
    pub fn is_alive(&self, id: EntityId) -> bool {
        !id.is_nil()
            && self
                .generations
                .get(id.index().as_usize())
                .is_some_and(|generation| *generation == id.generation())
    }

    /// The current generation of a slot, or `None` if the slot was never created.
    pub fn generation_of(&self, index: Index) -> Option<Generation> {
        self.generations.get(index.as_usize()).copied()
    }

    /// Number of slots created so far, not counting the nil slot.
    pub fn len(&self) -> usize {
        self.generations.len() - 1
    }

    /// Whether no slot has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of freed slots waiting for reuse.
    pub fn free_len(&self) -> usize {
        self.free_indices.len()
    }

    /// The configured reuse threshold.
    pub fn min_free_indices(&self) -> usize {
        self.min_free_indices
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn first_allocations_are_sequential_from_one() {
        // Given
        let mut allocator = Allocator::new();

        // When
        let ids: Vec<_> = (0..3).map(|_| allocator.alloc()).collect();

        // Then
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(id.index().get(), i as u32 + 1);
            assert_eq!(id.generation(), Generation::FIRST);
            assert!(allocator.is_alive(*id));
        }
    }

    #[test]
    fn free_bumps_generation_and_kills_id() {
        // Given
        let mut allocator = Allocator::new();
        let ids: Vec<_> = (0..3).map(|_| allocator.alloc()).collect();

        // When
        allocator.free(ids[1]);

        // Then
        assert_eq!(allocator.generation_of(Index(2)), Some(Generation(1)));
        assert!(!allocator.is_alive(ids[1]));
        assert!(allocator.is_alive(ids[0]));
        assert!(allocator.is_alive(ids[2]));
    }

    #[test]
    fn below_threshold_allocates_new_slot() {
        // Given
        let mut allocator = Allocator::new();
        let ids: Vec<_> = (0..3).map(|_| allocator.alloc()).collect();
        allocator.free(ids[1]);

        // When
        let next = allocator.alloc();

        // Then - slot 2 stays parked
        assert_eq!(next.index().get(), 4);
        assert_eq!(next.generation(), Generation::FIRST);
        assert_eq!(allocator.free_len(), 1);
    }

    #[test]
    fn reuse_starts_once_threshold_is_reached() {
        // Given
        let mut allocator = Allocator::new();
        let ids: Vec<_> = (0..Allocator::MIN_FREE_INDICES)
            .map(|_| allocator.alloc())
            .collect();
        for id in &ids[..Allocator::MIN_FREE_INDICES - 1] {
            allocator.free(*id);
        }

        // When - one short of the threshold
        let fresh = allocator.alloc();

        // Then
        assert_eq!(fresh.index().as_usize(), Allocator::MIN_FREE_INDICES + 1);

        // When - threshold reached
        allocator.free(ids[Allocator::MIN_FREE_INDICES - 1]);
        let reused = allocator.alloc();

        // Then - oldest freed slot comes back with its advanced generation
        assert_eq!(reused.index(), ids[0].index());
        assert_eq!(reused.generation(), Generation(1));
        assert!(allocator.is_alive(reused));
        assert!(!allocator.is_alive(ids[0]));
    }

    #[test]
    fn zero_threshold_reuses_immediately() {
        // Given
        let mut allocator = Allocator::with_min_free_indices(0);
        let first = allocator.alloc();

        // When
        allocator.free(first);
        let gen1 = allocator.alloc();
        allocator.free(gen1);
        let gen2 = allocator.alloc();

        // Then
        assert_eq!(gen1.index(), first.index());
        assert_eq!(gen1.generation(), Generation(1));
        assert_eq!(gen2.index(), first.index());
        assert_eq!(gen2.generation(), Generation(2));
    }

    #[test]
    fn generation_wraps_silently() {
        // Given
        let mut allocator = Allocator::with_min_free_indices(0);
        let original = allocator.alloc();

        // When - 256 reuses of the same slot
        let mut id = original;
        for _ in 0..256 {
            allocator.free(id);
            id = allocator.alloc();
        }

        // Then - the stale id is indistinguishable again
        assert_eq!(id, original);
        assert!(allocator.is_alive(original));
    }

    #[test]
    fn nil_is_never_alive() {
        let mut allocator = Allocator::new();
        allocator.alloc();

        assert!(!allocator.is_alive(EntityId::NIL));
        assert!(EntityId::NIL.is_nil());
    }

    #[test]
    fn unknown_slot_is_not_alive() {
        let allocator = Allocator::new();

        assert!(!allocator.is_alive(EntityId::new(Index(7), Generation::FIRST)));
        assert_eq!(allocator.generation_of(Index(7)), None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "freed an entity that is not alive")]
    fn double_free_panics_in_debug() {
        let mut allocator = Allocator::new();
        let id = allocator.alloc();
        allocator.free(id);

        allocator.free(id);
    }

    #[test]
    fn alloc_many_respects_threshold() {
        // Given
        let mut allocator = Allocator::with_min_free_indices(4);
        let ids = allocator.alloc_many(6);
        for id in &ids {
            allocator.free(*id);
        }

        // When - 6 parked, threshold 4: three pops leave the queue at 3
        let batch = allocator.alloc_many(5);

        // Then
        let reused = batch.iter().filter(|id| id.generation() == Generation(1)).count();
        assert_eq!(reused, 3);
        assert_eq!(allocator.free_len(), 3);
        assert_eq!(allocator.len(), 8);
        assert!(batch.iter().all(|id| allocator.is_alive(*id)));
    }

    #[test]
    fn alloc_many_matches_repeated_alloc() {
        // Given
        let mut single = Allocator::with_min_free_indices(2);
        let mut batch = Allocator::with_min_free_indices(2);
        for allocator in [&mut single, &mut batch] {
            let ids: Vec<_> = (0..5).map(|_| allocator.alloc()).collect();
            for id in ids {
                allocator.free(id);
            }
        }

        // When
        let one_by_one: Vec<_> = (0..7).map(|_| single.alloc()).collect();
        let all_at_once = batch.alloc_many(7);

        // Then
        assert_eq!(one_by_one, all_at_once);
    }

    #[test]
    fn reset_forgets_everything() {
        // Given
        let mut allocator = Allocator::new();
        let id = allocator.alloc();
        allocator.free(id);

        // When
        allocator.reset();

        // Then
        assert!(allocator.is_empty());
        assert_eq!(allocator.free_len(), 0);
        assert_eq!(allocator.alloc().index().get(), 1);
    }

    #[test]
    fn random_sequences_keep_live_ids_unique_and_alive() {
        // Given
        let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
        let mut allocator = Allocator::with_min_free_indices(16);
        let mut live: Vec<EntityId> = Vec::new();
        let mut dead: Vec<EntityId> = Vec::new();

        // When
        for _ in 0..20_000 {
            if live.is_empty() || rng.gen_bool(0.55) {
                let id = allocator.alloc();
                assert!(allocator.is_alive(id));
                live.push(id);
            } else {
                let victim = live.swap_remove(rng.gen_range(0..live.len()));
                let before = allocator.generation_of(victim.index()).unwrap();
                allocator.free(victim);
                assert_eq!(allocator.generation_of(victim.index()), Some(before.next()));
                assert!(!allocator.is_alive(victim));
                dead.push(victim);
            }
        }

        // Then
        let unique: HashSet<_> = live.iter().copied().collect();
        assert_eq!(unique.len(), live.len());
        assert!(live.iter().all(|id| allocator.is_alive(*id)));
        // Too few cycles per slot for any generation to wrap back around.
        assert!(dead.iter().all(|id| !unique.contains(id)));
    }

    #[test]
    fn entity_id_packs_index_and_generation() {
        // Given
        let id = EntityId::new(Index(0x00AB_CDEF), Generation(0x12));

        // Then
        assert_eq!(id.to_bits(), 0x12AB_CDEF);
        assert_eq!(id.index(), Index(0x00AB_CDEF));
        assert_eq!(id.generation(), Generation(0x12));
        assert_eq!(EntityId::from_bits(0x12AB_CDEF), id);
        assert_eq!(u32::from(id), 0x12AB_CDEF);
    }

    #[test]
    fn entity_id_formatting() {
        let id = EntityId::new(Index(2), Generation(1));

        assert_eq!(id.to_string(), "Entity#1000002");
        assert_eq!(format!("{id:?}"), "Entity{2,1}");
    }

    #[test]
    fn index_from_u32_masks_high_bits() {
        assert_eq!(Index::from(0xFF00_0001), Index(1));
        assert_eq!(Index::MAX.get(), (1 << 24) - 1);
    }

    #[test]
    fn generation_next_wraps() {
        assert_eq!(Generation::FIRST.next(), Generation(1));
        assert_eq!(Generation(255).next(), Generation::FIRST);
    }
}
