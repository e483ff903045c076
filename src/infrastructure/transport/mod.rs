//! Transport Module
//!
//! Abstract short-range radio used by the link session manager.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              LinkSessionManager               │
//! │   (single owner of the connection lifecycle)  │
//! └──────────────┬─────────────────▲─────────────┘
//!      requests  │                 │ TransportEvent
//!   scan/connect │                 │ (discovered, disconnected,
//!   write/...    ▼                 │  notification)
//! ┌──────────────────────────────────────────────┐
//! │                 dyn Transport                 │
//! │  platform radio stack  |  SimulatedTransport  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`simulated`] - In-memory radio with scripted peers and failure injection

pub mod simulated;

use crate::domain::error::TransportError;
use crate::domain::models::{Channel, ChannelId, DiscoveredPeer, PeerId};
use async_trait::async_trait;
use tokio::sync::mpsc;

pub use simulated::{SimulatedPeer, SimulatedTransport};

/// Notifications the radio pushes without being asked
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    PeerDiscovered(DiscoveredPeer),
    /// The link dropped without the manager asking for it
    Disconnected { peer: PeerId, reason: String },
    /// Data arriving on a subscribed channel
    Notification { channel: ChannelId, data: Vec<u8> },
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Hand the transport the sink for its asynchronous notifications.
    /// Called once, when the session manager is activated.
    fn attach(&self, events: mpsc::UnboundedSender<TransportEvent>);

    /// Start reporting advertising peers as `PeerDiscovered`
    async fn start_scan(&self) -> Result<(), TransportError>;

    async fn stop_scan(&self) -> Result<(), TransportError>;

    async fn connect(&self, peer: &PeerId) -> Result<(), TransportError>;

    /// Enumerate every channel the connected peer exposes
    async fn discover_channels(&self, peer: &PeerId) -> Result<Vec<Channel>, TransportError>;

    /// Enable notifications; data arrives as `Notification` events
    async fn subscribe(&self, peer: &PeerId, channel: &ChannelId) -> Result<(), TransportError>;

    async fn write(
        &self,
        peer: &PeerId,
        channel: &ChannelId,
        data: &[u8],
    ) -> Result<(), TransportError>;

    async fn read_signal_strength(&self, peer: &PeerId) -> Result<i16, TransportError>;

    /// User-initiated disconnect. Must not emit a `Disconnected` event.
    async fn disconnect(&self, peer: &PeerId) -> Result<(), TransportError>;

    /// Largest payload a single write accepts, if the radio enforces one
    fn max_frame_len(&self) -> Option<usize> {
        None
    }
}
