//! The explicit owner of per-world state.
//!
//! A [`Context`] bundles the entity [`Allocator`] with the event [`Hub`]. The allocator stays
//! behind `&mut self` and therefore with whoever owns the context, while the hub is shared through
//! an [`Arc`] so any thread (or host bridge) can listen and trigger.

use std::sync::Arc;

use log::info;

use crate::{
    entity::{Allocator, EntityId},
    event::Hub,
};

/// A context identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Id(id)
    }

    #[inline]
    pub const fn id(&self) -> u32 {
        self.0
    }
}

#[derive(Debug)]
pub struct Context {
    id: Id,
    entities: Allocator,
    events: Arc<Hub>,
}

impl Context {
    /// Construct a context with a default allocator and a hook-less hub.
    pub fn new(id: Id) -> Self {
        Self::with_parts(id, Allocator::new(), Hub::new())
    }

    /// Construct a context from a configured allocator and hub.
    pub fn with_parts(id: Id, entities: Allocator, events: Hub) -> Self {
        info!(
            "context {} ready (entity reuse threshold {})",
            id.0,
            entities.min_free_indices()
        );
        Self {
            id,
            entities,
            events: Arc::new(events),
        }
    }

    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Allocate a new entity.
    #[inline]
    pub fn spawn(&mut self) -> EntityId {
        self.entities.alloc()
    }

    /// Free a live entity.
    #[inline]
    pub fn despawn(&mut self, entity: EntityId) {
        self.entities.free(entity)
    }

    #[inline]
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.is_alive(entity)
    }

    #[inline]
    pub fn entities(&self) -> &Allocator {
        &self.entities
    }

    #[inline]
    pub fn entities_mut(&mut self) -> &mut Allocator {
        &mut self.entities
    }

    /// The shared event hub. Clone the `Arc` to hand it to other threads.
    #[inline]
    pub fn events(&self) -> &Arc<Hub> {
        &self.events
    }
}
