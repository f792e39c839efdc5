//! Document change feed: snapshots, change events and the bus that carries them.

pub mod bus;
pub mod change;
pub mod in_memory_bus;
pub mod pattern;

pub use bus::{EventBus, Subscription};
pub use change::{Change, ChangeKind, DocumentChange, DocumentSnapshot, Fields};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use pattern::{DOC_ID_PARAM, DocumentPattern};
