//! End-to-end walkthroughs of the allocator and registry contracts.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use hostlink::{
    Allocator, EntityId, EventSource, Listener,
    entity::{Generation, Index},
    sync::SortedList,
};

#[derive(Default)]
struct Hooks {
    enabled: AtomicUsize,
    disabled: AtomicUsize,
}

#[test]
fn allocator_walkthrough() {
    // Given
    let mut allocator = Allocator::new();

    // When - three allocations
    let ids: Vec<EntityId> = (0..3).map(|_| allocator.alloc()).collect();

    // Then
    let indices: Vec<u32> = ids.iter().map(|id| id.index().get()).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert!(ids.iter().all(|id| id.generation() == Generation::FIRST));
    assert!(ids.iter().all(|id| allocator.is_alive(*id)));

    // When - free the second
    allocator.free(ids[1]);

    // Then
    assert_eq!(allocator.generation_of(Index::from(2)), Some(Generation::from(1)));
    assert!(!allocator.is_alive(ids[1]));

    // When - allocate with far fewer than 1024 frees pending
    let next = allocator.alloc();

    // Then
    assert_eq!(next.index().get(), 4);
}

#[test]
fn registry_walkthrough() {
    // Given
    let hooks = Arc::new(Hooks::default());
    let source = {
        let on = Arc::clone(&hooks);
        let off = Arc::clone(&hooks);
        EventSource::<()>::new()
            .on_enable(move || {
                on.enabled.fetch_add(1, Ordering::Relaxed);
            })
            .on_disable(move || {
                off.disabled.fetch_add(1, Ordering::Relaxed);
            })
    };
    let calls = Arc::new(AtomicUsize::new(0));
    let listener = {
        let calls = Arc::clone(&calls);
        Listener::new(move |_: &()| {
            calls.fetch_add(1, Ordering::Relaxed);
        })
    };

    // When - trigger with nobody listening
    source.trigger(&());

    // Then
    assert_eq!(calls.load(Ordering::Relaxed), 0);

    // When - listen twice with the same listener
    let token = source.listen(&listener);
    source.listen(&listener);

    // Then
    assert_eq!(hooks.enabled.load(Ordering::Relaxed), 1);
    assert_eq!(source.len(), 1);
    assert!(source.is_listening(listener.token()));

    // When
    source.trigger(&());

    // Then
    assert_eq!(calls.load(Ordering::Relaxed), 1);

    // When - stop twice
    assert!(source.stop_listening(token));
    assert!(!source.stop_listening(token));

    // Then
    assert_eq!(hooks.disabled.load(Ordering::Relaxed), 1);
    assert_eq!(source.len(), 0);
}

#[test]
fn sorted_list_from_many_threads() {
    // Given
    let list = SortedList::new();

    // When - 8 threads x 100 distinct values, descending so every insert lands at the head
    std::thread::scope(|s| {
        for t in 0..8u32 {
            let list = &list;
            s.spawn(move || {
                for i in (0..100u32).rev() {
                    list.insert(i * 8 + t, |a: &u32, b: &u32| a < b);
                }
            });
        }
    });

    // Then
    let guard = &hostlink::sync::pin();
    let values: Vec<u32> = list.iter(guard).copied().collect();
    assert_eq!(values, (0..800).collect::<Vec<_>>());
}
