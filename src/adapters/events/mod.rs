//! Event bus adapters.
//!
//! Implementations of the `EventPublisher` port:
//!
//! - `InMemoryEventBus` - Broadcast channel for in-process subscribers,
//!   with optional capture for tests

mod in_memory;

pub use in_memory::InMemoryEventBus;
