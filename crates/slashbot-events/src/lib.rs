//! Slashbot Events - Event bus for the Slashbot assistant host.
//!
//! Envelopes are published to an [`EventBus`] which notifies subscribers.
//! There are two ways to subscribe:
//!
//! 1. **Synchronous subscribers**: registered per event type (or `"*"` for
//!    everything) and invoked inline from `publish`, in registration order.
//!
//! 2. **Async receivers**: `bus.subscribe()` returns an [`EventReceiver`]
//!    backed by a broadcast channel, for connector-style consumers.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod bus;
mod subscriber;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventReceiver};
pub use subscriber::{Subscription, WILDCARD};
