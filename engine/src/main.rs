use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
};

use hostlink::{
    Allocator, Context, EventKind, Hub,
    context::Id,
};
use log::info;

const FRAMES: u32 = 120;
const POINTER_THREADS: u32 = 4;

/// Drive one context the way a host bridge would: the simulation thread churns entities while
/// input threads subscribe, fire and unsubscribe pointer events.
fn main() {
    env_logger::init();

    let hub = Hub::new()
        .on_subscribe(|kind| info!("host: start delivering {kind}"))
        .on_unsubscribe(|kind| info!("host: stop delivering {kind}"));
    let mut context = Context::with_parts(Id::new(0), Allocator::new(), hub);

    let frames = Arc::new(AtomicU64::new(0));
    let frame_token = {
        let frames = Arc::clone(&frames);
        context
            .events()
            .listen_fn(EventKind::ANIMATION_FRAME, move |_| {
                frames.fetch_add(1, Ordering::Relaxed);
            })
    };

    let moves = Arc::new(AtomicU64::new(0));
    thread::scope(|s| {
        for t in 0..POINTER_THREADS {
            let events = Arc::clone(context.events());
            let moves = Arc::clone(&moves);
            s.spawn(move || {
                for i in 0..FRAMES {
                    let moves = Arc::clone(&moves);
                    let token = events.listen_fn(EventKind::POINTER_MOVE, move |payload| {
                        moves.fetch_add(payload.values().len() as u64, Ordering::Relaxed);
                    });
                    events.trigger(EventKind::POINTER_MOVE, &[t, i]);
                    events.stop_listening(EventKind::POINTER_MOVE, token);
                }
            });
        }

        let mut live = Vec::new();
        for frame in 0..FRAMES {
            context.events().trigger(EventKind::ANIMATION_FRAME, &[frame]);
            for _ in 0..64 {
                live.push(context.spawn());
            }
            // Retire the oldest half so slots start flowing through the recycle queue.
            for entity in live.drain(..32) {
                context.despawn(entity);
            }
        }
        info!(
            "{} live entities across {} slots, {} parked for reuse",
            live.len(),
            context.entities().len(),
            context.entities().free_len()
        );
    });

    context
        .events()
        .stop_listening(EventKind::ANIMATION_FRAME, frame_token);
    info!(
        "{} frames dispatched, {} pointer values delivered, still subscribed to [{}]",
        frames.load(Ordering::Relaxed),
        moves.load(Ordering::Relaxed),
        context.events().subscribed()
    );
}
