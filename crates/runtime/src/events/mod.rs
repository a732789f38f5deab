//! Topic-based event bus for runtime events.
//!
//! Combat events, turn notices and relay outcomes are published to separate
//! topics so consumers can subscribe only to the ones they need.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{RelayEvent, TurnEvent};
