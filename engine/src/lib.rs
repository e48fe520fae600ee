//! Core infrastructure for a browser-hosted renderer.
//!
//! - [`entity`]: compact generational entity ids and their allocator.
//! - [`sync`]: a lock-free sorted list with epoch-based reclamation.
//! - [`event`]: lock-free listener registries with enable/disable lifecycle hooks.
//! - [`context`]: the explicit owner of one world's allocator and event hub.
//! - [`logging`]: a channel-backed [`log`] sink for host bridges.

pub mod context;
pub mod entity;
pub mod event;
pub mod logging;
pub mod sync;

pub use context::Context;
pub use entity::{Allocator, EntityId};
pub use event::{Event, EventKind, EventSource, Hub, Listener, ListenerToken, Payload};
