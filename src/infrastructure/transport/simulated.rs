//! Simulated Transport
//!
//! In-memory radio. Peers advertise after a scripted delay once a scan
//! starts; connect, discovery and write failures can be injected, and every
//! write is recorded so the link lifecycle can be exercised without hardware.

use crate::domain::error::TransportError;
use crate::domain::models::{Channel, ChannelId, ChannelProperties, DiscoveredPeer, PeerId};
use crate::infrastructure::transport::{Transport, TransportEvent};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A peer the simulated radio can see
#[derive(Debug, Clone)]
pub struct SimulatedPeer {
    pub peer: DiscoveredPeer,
    pub channels: Vec<Channel>,
    /// Delay between scan start and the first advertisement
    pub advertise_after: Duration,
}

impl SimulatedPeer {
    /// A peer exposing one write channel and one notify channel
    pub fn compass_display(id: &str, name: &str) -> Self {
        Self {
            peer: DiscoveredPeer {
                id: id.into(),
                name: Some(name.to_string()),
                signal_strength: -58,
            },
            channels: vec![
                Channel {
                    id: "heading-rx".into(),
                    properties: ChannelProperties {
                        write: true,
                        ..Default::default()
                    },
                },
                Channel {
                    id: "status-tx".into(),
                    properties: ChannelProperties {
                        read: true,
                        notify: true,
                        ..Default::default()
                    },
                },
            ],
            advertise_after: Duration::from_millis(300),
        }
    }
}

#[derive(Default)]
struct SimState {
    events: Option<mpsc::UnboundedSender<TransportEvent>>,
    peers: Vec<SimulatedPeer>,
    scan_task: Option<JoinHandle<()>>,
    connected: Option<PeerId>,
    connect_latency: Duration,
    write_latency: Duration,
    max_frame_len: Option<usize>,

    // Injected failures, consumed one per call
    connect_failures: u32,
    discovery_failures: u32,
    write_failures: u32,

    // Observations
    scans_started: u32,
    connect_calls: u32,
    signal_reads: u32,
    subscriptions: Vec<ChannelId>,
    writes: Vec<(ChannelId, Vec<u8>)>,
    disconnects: Vec<PeerId>,
}

#[derive(Clone, Default)]
pub struct SimulatedTransport {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedTransport {
    pub fn new(peers: Vec<SimulatedPeer>) -> Self {
        let transport = Self::default();
        transport.lock().peers = peers;
        transport
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_connect_latency(&self, latency: Duration) {
        self.lock().connect_latency = latency;
    }

    pub fn set_write_latency(&self, latency: Duration) {
        self.lock().write_latency = latency;
    }

    pub fn set_max_frame_len(&self, max: Option<usize>) {
        self.lock().max_frame_len = max;
    }

    /// Fail the next `count` connect attempts
    pub fn fail_next_connects(&self, count: u32) {
        self.lock().connect_failures = count;
    }

    pub fn fail_next_discoveries(&self, count: u32) {
        self.lock().discovery_failures = count;
    }

    pub fn fail_next_writes(&self, count: u32) {
        self.lock().write_failures = count;
    }

    pub fn set_signal_strength(&self, peer: &PeerId, signal_strength: i16) {
        let mut state = self.lock();
        if let Some(p) = state.peers.iter_mut().find(|p| &p.peer.id == peer) {
            p.peer.signal_strength = signal_strength;
        }
    }

    /// Push an arbitrary notification, e.g. a repeated advertisement
    pub fn inject(&self, event: TransportEvent) {
        if let Some(events) = &self.lock().events {
            let _ = events.send(event);
        }
    }

    /// Drop the current link as if the peer went out of range
    pub fn drop_link(&self, reason: &str) {
        let mut state = self.lock();
        if let Some(peer) = state.connected.take() {
            info!("Simulated link to {} dropped: {}", peer, reason);
            if let Some(events) = &state.events {
                let _ = events.send(TransportEvent::Disconnected {
                    peer,
                    reason: reason.to_string(),
                });
            }
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.lock().scan_task.is_some()
    }

    pub fn connected_peer(&self) -> Option<PeerId> {
        self.lock().connected.clone()
    }

    pub fn scans_started(&self) -> u32 {
        self.lock().scans_started
    }

    pub fn connect_calls(&self) -> u32 {
        self.lock().connect_calls
    }

    pub fn signal_reads(&self) -> u32 {
        self.lock().signal_reads
    }

    pub fn subscriptions(&self) -> Vec<ChannelId> {
        self.lock().subscriptions.clone()
    }

    pub fn writes(&self) -> Vec<(ChannelId, Vec<u8>)> {
        self.lock().writes.clone()
    }

    /// Every peer passed to `disconnect`, in call order
    pub fn disconnects(&self) -> Vec<PeerId> {
        self.lock().disconnects.clone()
    }

    fn require_connected(state: &SimState, peer: &PeerId) -> Result<(), TransportError> {
        if state.connected.as_ref() == Some(peer) {
            Ok(())
        } else {
            Err(TransportError::NotConnected(peer.to_string()))
        }
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    fn attach(&self, events: mpsc::UnboundedSender<TransportEvent>) {
        self.lock().events = Some(events);
    }

    async fn start_scan(&self) -> Result<(), TransportError> {
        let mut state = self.lock();
        let events = state
            .events
            .clone()
            .ok_or_else(|| TransportError::Unavailable("transport not attached".to_string()))?;

        if let Some(task) = state.scan_task.take() {
            task.abort();
        }
        state.scans_started += 1;

        let mut schedule: Vec<(Duration, DiscoveredPeer)> = state
            .peers
            .iter()
            .map(|p| (p.advertise_after, p.peer.clone()))
            .collect();
        schedule.sort_by_key(|(after, _)| *after);

        debug!("Simulated scan started ({} peers in range)", schedule.len());
        state.scan_task = Some(tokio::spawn(async move {
            let mut elapsed = Duration::ZERO;
            for (after, peer) in schedule {
                tokio::time::sleep(after.saturating_sub(elapsed)).await;
                elapsed = after;
                if events.send(TransportEvent::PeerDiscovered(peer)).is_err() {
                    return;
                }
            }
        }));

        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        if let Some(task) = self.lock().scan_task.take() {
            debug!("Simulated scan stopped");
            task.abort();
        }
        Ok(())
    }

    async fn connect(&self, peer: &PeerId) -> Result<(), TransportError> {
        let latency = {
            let mut state = self.lock();
            state.connect_calls += 1;
            state.connect_latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        if !state.peers.iter().any(|p| &p.peer.id == peer) {
            return Err(TransportError::UnknownPeer(peer.to_string()));
        }
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(TransportError::ConnectFailed {
                peer: peer.to_string(),
                reason: "peer did not respond".to_string(),
            });
        }

        state.connected = Some(peer.clone());
        Ok(())
    }

    async fn discover_channels(&self, peer: &PeerId) -> Result<Vec<Channel>, TransportError> {
        let mut state = self.lock();
        Self::require_connected(&state, peer)?;
        if state.discovery_failures > 0 {
            state.discovery_failures -= 1;
            return Err(TransportError::DiscoveryFailed(
                "attribute table unavailable".to_string(),
            ));
        }

        let channels = state
            .peers
            .iter()
            .find(|p| &p.peer.id == peer)
            .map(|p| p.channels.clone())
            .unwrap_or_default();
        Ok(channels)
    }

    async fn subscribe(&self, peer: &PeerId, channel: &ChannelId) -> Result<(), TransportError> {
        let mut state = self.lock();
        Self::require_connected(&state, peer)?;
        state.subscriptions.push(channel.clone());
        Ok(())
    }

    async fn write(
        &self,
        peer: &PeerId,
        channel: &ChannelId,
        data: &[u8],
    ) -> Result<(), TransportError> {
        let latency = self.lock().write_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        Self::require_connected(&state, peer)?;

        if let Some(max) = state.max_frame_len {
            if data.len() > max {
                return Err(TransportError::WriteFailed {
                    channel: channel.to_string(),
                    reason: format!("frame of {} bytes exceeds {}", data.len(), max),
                });
            }
        }
        if state.write_failures > 0 {
            state.write_failures -= 1;
            return Err(TransportError::WriteFailed {
                channel: channel.to_string(),
                reason: "write not acknowledged".to_string(),
            });
        }

        state.writes.push((channel.clone(), data.to_vec()));
        Ok(())
    }

    async fn read_signal_strength(&self, peer: &PeerId) -> Result<i16, TransportError> {
        let mut state = self.lock();
        Self::require_connected(&state, peer)?;
        state.signal_reads += 1;
        state
            .peers
            .iter()
            .find(|p| &p.peer.id == peer)
            .map(|p| p.peer.signal_strength)
            .ok_or_else(|| TransportError::UnknownPeer(peer.to_string()))
    }

    async fn disconnect(&self, peer: &PeerId) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.disconnects.push(peer.clone());
        if state.connected.as_ref() == Some(peer) {
            state.connected = None;
        }
        Ok(())
    }

    fn max_frame_len(&self) -> Option<usize> {
        self.lock().max_frame_len
    }
}
