//! Link Module
//!
//! Owns the wireless session: scanning, connecting, capability discovery,
//! periodic transmission of the current fused reading, and
//! disconnect/retry policy.
//!
//! ## Modules
//!
//! - [`manager`] - Session actor and its public handle
//! - `timers` - Cancellable periodic and one-shot timers used by the actor

pub mod manager;
mod timers;

#[cfg(test)]
mod tests;

pub use manager::{LinkCommand, LinkHandle, LinkSessionManager};
