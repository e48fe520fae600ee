//! Listener registries that dispatch events to callbacks from any thread.
//!
//! - [`EventSource`] holds the listeners for one event stream in a lock-free
//!   [`SortedList`](crate::sync::SortedList) and fires lifecycle hooks when it gains its first
//!   listener or loses its last one.
//! - [`Hub`] keeps one source per [`EventKind`] and forwards those lifecycle transitions with the
//!   kind attached, which is what a host bridge needs to subscribe to host events on demand.
//!
//! Listeners are identified by the [`ListenerToken`] stamped on a [`Listener`] when it is created,
//! never by the address of the callback.
//!
//! # Example
//!
//! ```rust,ignore
//! let source = EventSource::<Resize>::new()
//!     .on_enable(|| host.subscribe())
//!     .on_disable(|| host.unsubscribe());
//!
//! let listener = Listener::new(|resize: &Resize| println!("{}x{}", resize.w, resize.h));
//! let token = source.listen(&listener);   // enable hook fires
//! source.trigger(&Resize { w: 640, h: 480 });
//! source.stop_listening(token);            // disable hook fires
//! ```

pub mod hub;
pub mod kind;
pub mod source;

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

pub use hub::Hub;
pub use kind::{EventKind, Payload};
pub use source::EventSource;

/// Marker trait for event types.
///
/// Events must be:
/// - `'static`: No borrowed data
/// - `Send + Sync`: Dispatched from whichever thread triggers them
/// - `Clone`: Callers may fan the same event out to several sources
pub trait Event: 'static + Send + Sync + Clone {}

/// Events without data.
impl Event for () {}

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Opaque handle naming one [`Listener`] and every clone of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerToken(u64);

impl ListenerToken {
    fn next() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw token value.
    #[inline]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// A shareable event callback with a stable identity.
///
/// Cloning is cheap and keeps the token, so registering a clone of an already registered
/// listener is a no-op.
pub struct Listener<E> {
    token: ListenerToken,
    callback: Arc<dyn Fn(&E) + Send + Sync>,
}

impl<E> Listener<E> {
    /// Wrap `callback` and stamp it with a fresh token.
    pub fn new(callback: impl Fn(&E) + Send + Sync + 'static) -> Self {
        Self {
            token: ListenerToken::next(),
            callback: Arc::new(callback),
        }
    }

    #[inline]
    pub fn token(&self) -> ListenerToken {
        self.token
    }

    /// Invoke the callback.
    #[inline]
    pub fn call(&self, event: &E) {
        (self.callback)(event)
    }
}

impl<E> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Self {
            token: self.token,
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<E> fmt::Debug for Listener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn tokens_are_unique_per_listener() {
        let a = Listener::<()>::new(|_| {});
        let b = Listener::<()>::new(|_| {});

        assert_ne!(a.token(), b.token());
    }

    #[test]
    fn clones_share_token_and_callback() {
        // Given
        let calls = Arc::new(AtomicUsize::new(0));
        let listener = {
            let calls = Arc::clone(&calls);
            Listener::<()>::new(move |_| {
                calls.fetch_add(1, Ordering::Relaxed);
            })
        };

        // When
        let clone = listener.clone();
        listener.call(&());
        clone.call(&());

        // Then
        assert_eq!(clone.token(), listener.token());
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn debug_shows_token() {
        let listener = Listener::<()>::new(|_| {});
        let rendered = format!("{listener:?}");

        assert!(rendered.contains(&listener.token().get().to_string()));
    }
}
