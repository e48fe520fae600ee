//! Per-kind event registry for host events.
//!
//! A host bridge owns one [`Hub`]. It wires [`Hub::on_subscribe`] / [`Hub::on_unsubscribe`] to
//! whatever tells the host to start or stop delivering a kind, and calls [`Hub::trigger`] for each
//! event the host reports. Listeners attach per [`EventKind`]; the host only delivers kinds that
//! somebody is listening to.

use std::{fmt, sync::Arc};

use dashmap::DashMap;
use log::{debug, warn};

use crate::event::{EventKind, EventSource, Listener, ListenerToken, Payload};

type KindHook = Arc<dyn Fn(EventKind) + Send + Sync>;

/// A map from [`EventKind`] to its own [`EventSource`], created on first use.
pub struct Hub {
    sources: DashMap<EventKind, Arc<EventSource<Payload>>>,
    on_subscribe: Option<KindHook>,
    on_unsubscribe: Option<KindHook>,
}

impl Hub {
    /// Construct a hub with no hooks.
    pub fn new() -> Self {
        Self {
            sources: DashMap::new(),
            on_subscribe: None,
            on_unsubscribe: None,
        }
    }

    /// Run `hook` with the kind whenever a kind gains its first listener.
    ///
    /// # Panics
    ///
    /// Panics if any kind already has a source, since existing sources would miss the hook.
    pub fn on_subscribe(mut self, hook: impl Fn(EventKind) + Send + Sync + 'static) -> Self {
        assert!(
            self.sources.is_empty(),
            "Hub hooks must be set before the first listen"
        );
        self.on_subscribe = Some(Arc::new(hook));
        self
    }

    /// Run `hook` with the kind whenever a kind loses its last listener.
    ///
    /// # Panics
    ///
    /// Panics if any kind already has a source, since existing sources would miss the hook.
    pub fn on_unsubscribe(mut self, hook: impl Fn(EventKind) + Send + Sync + 'static) -> Self {
        assert!(
            self.sources.is_empty(),
            "Hub hooks must be set before the first listen"
        );
        self.on_unsubscribe = Some(Arc::new(hook));
        self
    }

    /// Register `listener` for `kind`.
    pub fn listen(&self, kind: EventKind, listener: &Listener<Payload>) -> ListenerToken {
        // The map guard is released before listening so hooks and listeners never run under it.
        let source = self.source_or_insert(kind);
        source.listen(listener)
    }

    /// Register a bare callback for `kind`.
    pub fn listen_fn(
        &self,
        kind: EventKind,
        callback: impl Fn(&Payload) + Send + Sync + 'static,
    ) -> ListenerToken {
        self.listen(kind, &Listener::new(callback))
    }

    /// Remove the listener registered for `kind` under `token`.
    pub fn stop_listening(&self, kind: EventKind, token: ListenerToken) -> bool {
        let Some(source) = self.source(kind) else {
            warn!("stop_listening for {kind}, which never had a listener");
            return false;
        };
        source.stop_listening(token)
    }

    /// Whether a listener is registered for `kind` under `token`.
    pub fn is_listening(&self, kind: EventKind, token: ListenerToken) -> bool {
        self.source(kind)
            .is_some_and(|source| source.is_listening(token))
    }

    /// Dispatch one `kind` event carrying `values` to the kind's listeners.
    ///
    /// Only the exact kind is matched. Kinds nobody listens to are ignored.
    pub fn trigger(&self, kind: EventKind, values: &[u32]) {
        if let Some(source) = self.source(kind) {
            source.trigger(&Payload::new(kind, values));
        }
    }

    /// Number of listeners registered for `kind`.
    pub fn len(&self, kind: EventKind) -> usize {
        self.source(kind).map_or(0, |source| source.len())
    }

    /// Union of every kind that currently has at least one listener.
    pub fn subscribed(&self) -> EventKind {
        self.sources
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .fold(EventKind::NONE, |kinds, entry| kinds | *entry.key())
    }

    fn source(&self, kind: EventKind) -> Option<Arc<EventSource<Payload>>> {
        self.sources
            .get(&kind)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn source_or_insert(&self, kind: EventKind) -> Arc<EventSource<Payload>> {
        let entry = self.sources.entry(kind).or_insert_with(|| {
            debug!("creating event source for {kind}");
            Arc::new(self.build_source(kind))
        });
        Arc::clone(entry.value())
    }

    fn build_source(&self, kind: EventKind) -> EventSource<Payload> {
        let mut source = EventSource::new();
        if let Some(hook) = &self.on_subscribe {
            let hook = Arc::clone(hook);
            source = source.on_enable(move || {
                debug!("subscribing to {kind}");
                hook(kind)
            });
        }
        if let Some(hook) = &self.on_unsubscribe {
            let hook = Arc::clone(hook);
            source = source.on_disable(move || {
                debug!("unsubscribing from {kind}");
                hook(kind)
            });
        }
        source
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("subscribed", &self.subscribed())
            .finish_non_exhaustive()
    }
}
