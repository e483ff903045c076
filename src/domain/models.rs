use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::geo::normalize_degrees;

/// Pitch and roll below this magnitude (degrees) count as lying flat
pub const FLAT_TOLERANCE_DEG: f64 = 10.0;

/// Merged heading/attitude/location snapshot.
///
/// A new value is produced on every sensor update; readings are never
/// mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FusedReading {
    // Heading (degrees). True heading is stored as delivered and may be negative.
    pub magnetic_heading: f64,
    pub true_heading: f64,

    // Attitude (degrees)
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,

    // Position
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,

    // Seconds since the Unix epoch
    pub timestamp: f64,
}

impl FusedReading {
    /// True heading folded into `[0, 360)`
    pub fn normalized_heading(&self) -> f64 {
        normalize_degrees(self.true_heading)
    }

    pub fn octant(&self) -> CompassOctant {
        CompassOctant::from_heading(self.true_heading)
    }

    /// Rounded heading for display, e.g. `"350°"`
    pub fn heading_degrees(&self) -> String {
        let rounded = self.normalized_heading().round() as u32 % 360;
        format!("{}°", rounded)
    }

    pub fn is_flat(&self) -> bool {
        self.pitch.abs() < FLAT_TOLERANCE_DEG && self.roll.abs() < FLAT_TOLERANCE_DEG
    }
}

/// One of the eight 45°-wide compass buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompassOctant {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl CompassOctant {
    const ALL: [CompassOctant; 8] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
    ];

    /// Bucket a heading. Buckets are centred on the cardinal points, so
    /// North covers `[337.5, 22.5)`.
    pub fn from_heading(heading: f64) -> Self {
        let normalized = normalize_degrees(heading);
        let index = ((normalized + 22.5) / 45.0).floor() as usize % 8;
        Self::ALL[index]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::North => "N",
            Self::NorthEast => "NE",
            Self::East => "E",
            Self::SouthEast => "SE",
            Self::South => "S",
            Self::SouthWest => "SW",
            Self::West => "W",
            Self::NorthWest => "NW",
        }
    }
}

impl fmt::Display for CompassOctant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Opaque peer identifier, stable for the lifetime of a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub String);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredPeer {
    pub id: PeerId,
    pub name: Option<String>,
    /// dBm-like scale
    pub signal_strength: i16,
}

impl DiscoveredPeer {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(pub String);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelProperties {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
}

/// An addressable endpoint exposed by a connected peer
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub id: ChannelId,
    pub properties: ChannelProperties,
}

/// Channels resolved during capability discovery
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Capabilities {
    pub channels: Vec<Channel>,
    pub transmit: Option<ChannelId>,
    pub receive: Option<ChannelId>,
}

impl Capabilities {
    /// Pick the first writable channel for transmission and the first
    /// readable or notifiable channel for reception.
    pub fn resolve(channels: Vec<Channel>) -> Self {
        let transmit = channels
            .iter()
            .find(|c| c.properties.write)
            .map(|c| c.id.clone());
        let receive = channels
            .iter()
            .find(|c| c.properties.read || c.properties.notify)
            .map(|c| c.id.clone());

        Self {
            channels,
            transmit,
            receive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Idle,
    Scanning,
    Connecting,
    DiscoveringCapabilities,
    Ready,
    Transmitting,
    Disconnected,
    Failed,
}

impl LinkState {
    /// States in which the transport holds an open connection to a peer
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            Self::DiscoveringCapabilities | Self::Ready | Self::Transmitting
        )
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Idle => "Idle",
            Self::Scanning => "Scanning",
            Self::Connecting => "Connecting",
            Self::DiscoveringCapabilities => "Discovering capabilities",
            Self::Ready => "Ready",
            Self::Transmitting => "Transmitting",
            Self::Disconnected => "Disconnected",
            Self::Failed => "Failed",
        };
        f.write_str(text)
    }
}

/// State of one connection attempt. Replaced on every new connect.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinkSession {
    pub peer: Option<DiscoveredPeer>,
    pub capabilities: Capabilities,
    pub transmission_enabled: bool,
    pub signal_strength: Option<i16>,
    pub last_error: Option<String>,
}

impl LinkSession {
    pub fn for_peer(peer: DiscoveredPeer) -> Self {
        Self {
            signal_strength: Some(peer.signal_strength),
            peer: Some(peer),
            ..Default::default()
        }
    }

    pub fn peer_id(&self) -> Option<&PeerId> {
        self.peer.as_ref().map(|p| &p.id)
    }
}

/// Read-only view published to the presentation layer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinkSnapshot {
    pub state: LinkState,
    pub session: Option<LinkSession>,
    pub discovered: Vec<DiscoveredPeer>,
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    LinkState(LinkState),
    PeerDiscovered(DiscoveredPeer),
    PeerData(Vec<u8>),
    LogMessage(StatusMessage),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>, severity: MessageSeverity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}
