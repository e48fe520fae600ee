use std::{
    fmt,
    sync::atomic::{AtomicIsize, Ordering},
};

use log::{debug, trace};

use crate::{
    event::{Event, Listener, ListenerToken},
    sync::SortedList,
};

type Hook = Box<dyn Fn() + Send + Sync>;

/// A lock-free registry of listeners for one stream of events.
///
/// Listeners are kept in registration order and triggered in that order. `listen`,
/// `stop_listening` and `trigger` may all run concurrently; a trigger sees every listener that
/// was registered before it started and may or may not see ones registered while it runs.
///
/// # Lifecycle Hooks
///
/// The enable hook runs when the listener count goes from 0 to 1 and the disable hook when it
/// goes from 1 to 0, each exactly once per transition and on the thread that caused it. When a
/// `listen` and a `stop_listening` race around zero, their hooks may run in either order.
pub struct EventSource<E: Event> {
    listeners: SortedList<Listener<E>>,

    /// Live listener count. Signed because a racing stop may briefly run ahead of the listen
    /// whose entry it removed.
    len: AtomicIsize,

    on_enable: Option<Hook>,
    on_disable: Option<Hook>,
}

impl<E: Event> EventSource<E> {
    /// Construct an empty source with no hooks.
    pub fn new() -> Self {
        Self {
            listeners: SortedList::new(),
            len: AtomicIsize::new(0),
            on_enable: None,
            on_disable: None,
        }
    }

    /// Run `hook` whenever the source gains its first listener.
    pub fn on_enable(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_enable = Some(Box::new(hook));
        self
    }

    /// Run `hook` whenever the source loses its last listener.
    pub fn on_disable(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disable = Some(Box::new(hook));
        self
    }

    /// Register `listener` after every existing one and return its token.
    ///
    /// Registering a listener (or a clone of one) that is already present changes nothing.
    pub fn listen(&self, listener: &Listener<E>) -> ListenerToken {
        let token = listener.token();
        // Appending scans the whole list, trading insert speed for in-order triggers.
        if !self
            .listeners
            .push_back_unique(listener.clone(), |existing| existing.token() == token)
        {
            trace!("listener {token:?} is already registered");
            return token;
        }

        if self.len.fetch_add(1, Ordering::AcqRel) == 0 {
            debug!("event source enabled");
            if let Some(hook) = &self.on_enable {
                hook();
            }
        }
        token
    }

    /// Register a bare callback, returning the token needed to remove it.
    pub fn listen_fn(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> ListenerToken {
        self.listen(&Listener::new(callback))
    }

    /// Remove the listener registered under `token`. Returns `false` if it is not registered.
    pub fn stop_listening(&self, token: ListenerToken) -> bool {
        if !self.listeners.remove_first(|l| l.token() == token) {
            return false;
        }

        if self.len.fetch_sub(1, Ordering::AcqRel) == 1 {
            debug!("event source disabled");
            if let Some(hook) = &self.on_disable {
                hook();
            }
        }
        true
    }

    /// Whether a listener is registered under `token`.
    pub fn is_listening(&self, token: ListenerToken) -> bool {
        self.listeners.contains(|l| l.token() == token)
    }

    /// Call every registered listener with `event`, in registration order.
    pub fn trigger(&self, event: &E) {
        self.listeners.range(|listener| {
            listener.call(event);
            true
        });
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Event> Default for EventSource<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for EventSource<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("len", &self.len())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
