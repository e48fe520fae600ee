//! Deterministic workloads shared by the benchmarks.

use hostlink::{Allocator, EntityId, sync::SortedList};
use rand::{Rng, SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;

/// Seed used by every workload so runs are comparable.
pub const SEED: u64 = 0x686f_7374;

/// An allocator with `live` entities allocated and `parked` more freed, so the recycle queue
/// starts with `parked` slots waiting.
pub fn primed_allocator(live: usize, parked: usize, min_free_indices: usize) -> (Allocator, Vec<EntityId>) {
    let mut allocator = Allocator::with_min_free_indices(min_free_indices);
    let mut ids = allocator.alloc_many(live + parked);
    for id in ids.drain(live..) {
        allocator.free(id);
    }
    (allocator, ids)
}

/// Free and reallocate `rounds` random live entities, keeping the live count constant.
pub fn churn(allocator: &mut Allocator, live: &mut [EntityId], rounds: usize, rng: &mut ChaCha8Rng) {
    for _ in 0..rounds {
        let slot = rng.gen_range(0..live.len());
        allocator.free(live[slot]);
        live[slot] = allocator.alloc();
    }
}

/// `count` distinct keys in shuffled order.
pub fn shuffled_keys(count: u32) -> Vec<u32> {
    let mut keys: Vec<u32> = (0..count).collect();
    keys.shuffle(&mut ChaCha8Rng::seed_from_u64(SEED));
    keys
}

/// Build an ascending list from `keys`.
pub fn sorted_list(keys: &[u32]) -> SortedList<u32> {
    let list = SortedList::new();
    for key in keys {
        list.insert(*key, |a, b| a < b);
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primed_allocator_parks_requested_slots() {
        let (allocator, live) = primed_allocator(10, 5, 4);

        assert_eq!(live.len(), 10);
        assert_eq!(allocator.free_len(), 5);
        assert!(live.iter().all(|id| allocator.is_alive(*id)));
    }

    #[test]
    fn churn_keeps_everything_alive() {
        let (mut allocator, mut live) = primed_allocator(32, 8, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(SEED);

        churn(&mut allocator, &mut live, 500, &mut rng);

        assert!(live.iter().all(|id| allocator.is_alive(*id)));
    }

    #[test]
    fn sorted_list_from_shuffled_keys() {
        let list = sorted_list(&shuffled_keys(64));
        let guard = &hostlink::sync::pin();

        assert_eq!(
            list.iter(guard).copied().collect::<Vec<_>>(),
            (0..64).collect::<Vec<_>>()
        );
    }
}
