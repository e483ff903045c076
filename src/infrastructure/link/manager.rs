//! Link Session Manager
//!
//! Drives the connection lifecycle against a [`Transport`]:
//!
//! ```text
//! Idle ─► Scanning ─► Connecting ─► DiscoveringCapabilities ─► Ready ◄─► Transmitting
//!  ▲         │  ▲          │ (one retry after backoff)           │            │
//!  │         │  └──────────┘                                     ▼            ▼
//!  └─ reset ─┴──────────────────────────────────────────── Disconnected / Failed
//! ```
//!
//! All state lives in one actor task. Commands from [`LinkHandle`], transport
//! notifications, results of spawned transport operations and timer ticks
//! are funnelled into a single `select!` loop and handled one at a time, so
//! nothing races on the session.

use crate::domain::aggregator::SensorAggregator;
use crate::domain::error::{LinkError, TransportError};
use crate::domain::models::{
    AppEvent, Capabilities, Channel, DiscoveredPeer, LinkSession, LinkSnapshot, LinkState,
    MessageSeverity, PeerId, StatusMessage,
};
use crate::domain::payload::{split_frames, unix_now, WirePayload};
use crate::domain::settings::LinkConfig;
use crate::infrastructure::link::timers::{Deadline, Periodic};
use crate::infrastructure::transport::{Transport, TransportEvent};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Requests accepted by the session actor
#[derive(Debug, Clone, PartialEq)]
pub enum LinkCommand {
    StartScanning,
    StopScanning,
    Connect(PeerId),
    /// User-initiated; never schedules a reconnect
    Disconnect,
    EnableTransmission,
    DisableTransmission,
    /// Drop everything and return to Idle
    Reset,
    Shutdown,
}

struct Request {
    command: LinkCommand,
    done: oneshot::Sender<()>,
}

/// Results of transport operations that run off the actor
#[derive(Debug)]
enum Completion {
    Connected {
        attempt: u64,
        peer: PeerId,
        result: Result<(), TransportError>,
    },
    ChannelsDiscovered {
        attempt: u64,
        result: Result<Vec<Channel>, TransportError>,
    },
}

enum Event {
    Command(LinkCommand),
    Transport(TransportEvent),
    Completed(Completion),
    TransmitTick,
    SignalTick,
    ScanTimeout,
    RetryConnect,
    Reconnect,
}

/// Cloneable front door to a running session actor
#[derive(Clone)]
pub struct LinkHandle {
    requests: mpsc::UnboundedSender<Request>,
    snapshot: watch::Receiver<LinkSnapshot>,
}

impl LinkHandle {
    pub async fn start_scanning(&self) -> Result<(), LinkError> {
        self.send(LinkCommand::StartScanning).await
    }

    pub async fn stop_scanning(&self) -> Result<(), LinkError> {
        self.send(LinkCommand::StopScanning).await
    }

    pub async fn connect(&self, peer: PeerId) -> Result<(), LinkError> {
        self.send(LinkCommand::Connect(peer)).await
    }

    pub async fn disconnect(&self) -> Result<(), LinkError> {
        self.send(LinkCommand::Disconnect).await
    }

    pub async fn enable_transmission(&self) -> Result<(), LinkError> {
        self.send(LinkCommand::EnableTransmission).await
    }

    /// Returns once the transmission timer is cancelled; no tick is handled
    /// after that point.
    pub async fn disable_transmission(&self) -> Result<(), LinkError> {
        self.send(LinkCommand::DisableTransmission).await
    }

    pub async fn reset(&self) -> Result<(), LinkError> {
        self.send(LinkCommand::Reset).await
    }

    pub async fn shutdown(&self) -> Result<(), LinkError> {
        self.send(LinkCommand::Shutdown).await
    }

    /// Resolves once the actor has handled the command
    pub async fn send(&self, command: LinkCommand) -> Result<(), LinkError> {
        let (done, handled) = oneshot::channel();
        self.requests
            .send(Request { command, done })
            .map_err(|_| LinkError::Closed)?;
        handled.await.map_err(|_| LinkError::Closed)
    }

    pub fn snapshot(&self) -> LinkSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<LinkSnapshot> {
        self.snapshot.clone()
    }
}

/// Inert until [`activate`](Self::activate) is called
pub struct LinkSessionManager {
    transport: Arc<dyn Transport>,
    aggregator: SensorAggregator,
    config: LinkConfig,
}

impl LinkSessionManager {
    pub fn create(
        transport: Arc<dyn Transport>,
        aggregator: SensorAggregator,
        config: LinkConfig,
    ) -> Self {
        Self {
            transport,
            aggregator,
            config,
        }
    }

    /// Attach to the transport and spawn the session actor
    pub fn activate(self) -> (LinkHandle, mpsc::UnboundedReceiver<AppEvent>) {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (event_sender, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(LinkSnapshot::default());

        self.transport.attach(transport_tx);

        let actor = SessionActor {
            transport: self.transport,
            aggregator: self.aggregator,
            config: self.config,
            state: LinkState::Idle,
            session: None,
            discovered: Vec::new(),
            attempt: 0,
            retry_used: false,
            auto_connect_suppressed: false,
            requests: requests_rx,
            transport_events: transport_rx,
            completions: completions_rx,
            completions_tx,
            transmit_timer: Periodic::default(),
            signal_timer: Periodic::default(),
            scan_deadline: Deadline::default(),
            retry_deadline: Deadline::default(),
            reconnect_deadline: Deadline::default(),
            snapshot_tx,
            event_sender,
        };
        tokio::spawn(actor.run());

        info!("Link session manager activated");
        (
            LinkHandle {
                requests: requests_tx,
                snapshot: snapshot_rx,
            },
            event_rx,
        )
    }
}

struct SessionActor {
    transport: Arc<dyn Transport>,
    aggregator: SensorAggregator,
    config: LinkConfig,

    state: LinkState,
    session: Option<LinkSession>,
    discovered: Vec<DiscoveredPeer>,

    // Bumped whenever in-flight transport operations become stale
    attempt: u64,
    retry_used: bool,
    auto_connect_suppressed: bool,

    requests: mpsc::UnboundedReceiver<Request>,
    transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    completions: mpsc::UnboundedReceiver<Completion>,
    completions_tx: mpsc::UnboundedSender<Completion>,

    transmit_timer: Periodic,
    signal_timer: Periodic,
    scan_deadline: Deadline,
    retry_deadline: Deadline,
    reconnect_deadline: Deadline,

    snapshot_tx: watch::Sender<LinkSnapshot>,
    event_sender: mpsc::UnboundedSender<AppEvent>,
}

impl SessionActor {
    async fn run(mut self) {
        loop {
            let mut ack = None;
            let event = tokio::select! {
                // Commands first so a cancel queued behind a due tick wins
                biased;
                request = self.requests.recv() => match request {
                    Some(Request { command, done }) => {
                        ack = Some(done);
                        Event::Command(command)
                    }
                    None => break,
                },
                Some(completion) = self.completions.recv() => Event::Completed(completion),
                Some(event) = self.transport_events.recv() => Event::Transport(event),
                _ = self.scan_deadline.elapsed() => Event::ScanTimeout,
                _ = self.retry_deadline.elapsed() => Event::RetryConnect,
                _ = self.reconnect_deadline.elapsed() => Event::Reconnect,
                _ = self.signal_timer.tick() => Event::SignalTick,
                _ = self.transmit_timer.tick() => Event::TransmitTick,
            };

            let keep_running = self.handle(event).await;
            self.publish_snapshot();

            // Acknowledge only once the snapshot reflects the command
            if let Some(done) = ack {
                let _ = done.send(());
            }
            if !keep_running {
                break;
            }
        }

        info!("Link session manager stopped");
    }

    async fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Command(command) => return self.handle_command(command).await,
            Event::Transport(event) => self.handle_transport_event(event).await,
            Event::Completed(completion) => self.handle_completion(completion).await,
            Event::TransmitTick => self.transmit_tick().await,
            Event::SignalTick => self.poll_signal_strength().await,
            Event::ScanTimeout => self.scan_timed_out().await,
            Event::RetryConnect => self.retry_connect(),
            Event::Reconnect => self.reconnect().await,
        }
        true
    }

    async fn handle_command(&mut self, command: LinkCommand) -> bool {
        debug!("Link command: {:?} (state: {})", command, self.state);
        match command {
            LinkCommand::StartScanning => self.start_scanning().await,
            LinkCommand::StopScanning => self.stop_scanning().await,
            LinkCommand::Connect(peer) => self.connect_by_id(&peer).await,
            LinkCommand::Disconnect => self.disconnect().await,
            LinkCommand::EnableTransmission => self.enable_transmission(),
            LinkCommand::DisableTransmission => self.disable_transmission(),
            LinkCommand::Reset => self.reset().await,
            LinkCommand::Shutdown => {
                self.reset().await;
                return false;
            }
        }
        true
    }

    async fn start_scanning(&mut self) {
        match self.state {
            LinkState::Idle | LinkState::Disconnected | LinkState::Failed | LinkState::Scanning => {
            }
            LinkState::DiscoveringCapabilities if !self.has_transmit_channel() => {
                // Drop the unusable link so the peer can be discovered again
                if let Some(peer) = self.current_peer() {
                    if let Err(e) = self.transport.disconnect(&peer).await {
                        warn!("Transport disconnect failed: {}", e);
                    }
                }
                self.teardown();
            }
            state => {
                self.send_log(
                    &format!("Cannot start scanning while {}", state),
                    MessageSeverity::Warning,
                );
                return;
            }
        }

        // An explicit scan renews the retry budget and cancels a pending reconnect
        self.retry_used = false;
        self.auto_connect_suppressed = false;
        self.reconnect_deadline.disarm();
        self.begin_scan().await;
    }

    async fn begin_scan(&mut self) {
        self.discovered.clear();
        self.session = None;

        if let Err(e) = self.transport.start_scan().await {
            error!("Failed to start scan: {}", e);
            self.scan_deadline.disarm();
            self.set_state(LinkState::Failed);
            self.send_log(&format!("Scan failed: {}", e), MessageSeverity::Error);
            return;
        }

        self.scan_deadline.arm(self.config.scan_timeout);
        self.set_state(LinkState::Scanning);
        self.send_log("Scanning for peers...", MessageSeverity::Info);
    }

    async fn stop_scanning(&mut self) {
        if self.state != LinkState::Scanning {
            return;
        }
        self.halt_scan().await;
        self.set_state(LinkState::Idle);
        self.send_log("Scan stopped.", MessageSeverity::Info);
    }

    async fn halt_scan(&mut self) {
        self.scan_deadline.disarm();
        if let Err(e) = self.transport.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }
    }

    async fn scan_timed_out(&mut self) {
        if self.state != LinkState::Scanning {
            return;
        }
        self.halt_scan().await;
        self.set_state(LinkState::Disconnected);

        let message = if self.discovered.is_empty() {
            "No peers found".to_string()
        } else {
            format!(
                "Scan timed out before connecting ({} peers seen)",
                self.discovered.len()
            )
        };
        self.send_log(&message, MessageSeverity::Warning);
    }

    fn on_peer_discovered(&mut self, peer: DiscoveredPeer) -> Option<DiscoveredPeer> {
        if self.state != LinkState::Scanning {
            debug!("Ignoring advertisement from {} outside a scan", peer.id);
            return None;
        }

        if let Some(existing) = self.discovered.iter_mut().find(|p| p.id == peer.id) {
            existing.signal_strength = peer.signal_strength;
            return None;
        }

        info!(
            "Discovered peer {} ({}, {} dBm)",
            peer.display_name(),
            peer.id,
            peer.signal_strength
        );
        self.discovered.push(peer.clone());
        let _ = self.event_sender.send(AppEvent::PeerDiscovered(peer.clone()));

        if self.auto_connect_suppressed {
            return None;
        }
        let filter = self.config.auto_connect_filter.as_deref()?;
        let name = peer.name.as_deref()?;
        if name.contains(filter) {
            info!("Peer {} matches auto-connect filter '{}'", name, filter);
            Some(peer)
        } else {
            None
        }
    }

    async fn connect_by_id(&mut self, peer_id: &PeerId) {
        if self.state != LinkState::Scanning {
            self.send_log(
                &format!("Cannot connect while {}", self.state),
                MessageSeverity::Warning,
            );
            return;
        }

        match self.discovered.iter().find(|p| &p.id == peer_id).cloned() {
            Some(peer) => self.begin_connect(peer).await,
            None => self.send_log(
                &format!("Peer {} has not been discovered", peer_id),
                MessageSeverity::Warning,
            ),
        }
    }

    async fn begin_connect(&mut self, peer: DiscoveredPeer) {
        self.halt_scan().await;

        self.send_log(
            &format!("Connecting to {}...", peer.display_name()),
            MessageSeverity::Info,
        );
        self.session = Some(LinkSession::for_peer(peer));
        self.set_state(LinkState::Connecting);
        self.spawn_connect();
    }

    fn spawn_connect(&mut self) {
        let Some(peer) = self.current_peer() else {
            return;
        };

        self.attempt += 1;
        let attempt = self.attempt;
        let transport = self.transport.clone();
        let completions = self.completions_tx.clone();

        tokio::spawn(async move {
            let result = transport.connect(&peer).await;
            let _ = completions.send(Completion::Connected {
                attempt,
                peer,
                result,
            });
        });
    }

    fn spawn_discovery(&mut self) {
        let Some(peer) = self.current_peer() else {
            return;
        };

        let attempt = self.attempt;
        let transport = self.transport.clone();
        let completions = self.completions_tx.clone();

        tokio::spawn(async move {
            let result = transport.discover_channels(&peer).await;
            let _ = completions.send(Completion::ChannelsDiscovered { attempt, result });
        });
    }

    async fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Connected {
                attempt,
                peer,
                result,
            } => {
                if attempt != self.attempt || self.state != LinkState::Connecting {
                    debug!("Ignoring stale connect result for {} (attempt {})", peer, attempt);
                    // A late success still holds a radio link nobody owns
                    if result.is_ok() && self.current_peer().as_ref() != Some(&peer) {
                        self.release_stale_link(&peer).await;
                    }
                    return;
                }
                match result {
                    Ok(()) => self.on_connected(),
                    Err(e) => self.on_transient_failure(e).await,
                }
            }
            Completion::ChannelsDiscovered { attempt, result } => {
                if attempt != self.attempt || self.state != LinkState::DiscoveringCapabilities {
                    debug!("Ignoring stale discovery result (attempt {})", attempt);
                    return;
                }
                match result {
                    Ok(channels) => self.on_channels_discovered(channels).await,
                    Err(e) => self.on_transient_failure(e).await,
                }
            }
        }
    }

    async fn release_stale_link(&self, peer: &PeerId) {
        info!("Releasing stale link to {}", peer);
        if let Err(e) = self.transport.disconnect(peer).await {
            warn!("Transport disconnect failed: {}", e);
        }
    }

    fn on_connected(&mut self) {
        info!("Transport connected; discovering capabilities");
        self.set_state(LinkState::DiscoveringCapabilities);
        self.signal_timer.start(self.config.signal_poll_interval);
        self.spawn_discovery();
    }

    async fn on_channels_discovered(&mut self, channels: Vec<Channel>) {
        let capabilities = Capabilities::resolve(channels);
        info!(
            "Found {} channels (transmit: {:?}, receive: {:?})",
            capabilities.channels.len(),
            capabilities.transmit,
            capabilities.receive
        );

        if let (Some(peer), Some(receive)) = (self.current_peer(), capabilities.receive.clone()) {
            let notifiable = capabilities
                .channels
                .iter()
                .any(|c| c.id == receive && c.properties.notify);
            if notifiable {
                if let Err(e) = self.transport.subscribe(&peer, &receive).await {
                    warn!("Could not enable notifications on {}: {}", receive, e);
                }
            }
        }

        let has_transmit = capabilities.transmit.is_some();
        let peer_name = self
            .session
            .as_ref()
            .and_then(|s| s.peer.as_ref())
            .map(|p| p.display_name().to_string())
            .unwrap_or_default();

        if let Some(session) = self.session.as_mut() {
            session.capabilities = capabilities;
            if !has_transmit {
                session.last_error =
                    Some(LinkError::CapabilityNotFound(peer_name.clone()).to_string());
            }
        }

        if has_transmit {
            self.set_state(LinkState::Ready);
            self.send_log(
                &format!("Connected to {}", peer_name),
                MessageSeverity::Success,
            );
        } else {
            // Stays put until the peer is discovered again
            warn!("Peer {} exposes no writable channel", peer_name);
            self.send_log("No writable channel on peer", MessageSeverity::Warning);
        }
    }

    async fn on_transient_failure(&mut self, error: TransportError) {
        let error = LinkError::TransientConnection(error);
        warn!("{}", error);

        self.signal_timer.stop();
        if self.state.is_connected() {
            if let Some(peer) = self.current_peer() {
                let _ = self.transport.disconnect(&peer).await;
            }
        }
        if let Some(session) = self.session.as_mut() {
            session.last_error = Some(error.to_string());
            session.capabilities = Capabilities::default();
        }

        if !self.retry_used {
            self.retry_used = true;
            self.set_state(LinkState::Connecting);
            self.retry_deadline.arm(self.config.connect_retry_backoff);
            self.send_log(
                &format!(
                    "Connection failed. Retrying in {}s...",
                    self.config.connect_retry_backoff.as_secs_f64()
                ),
                MessageSeverity::Warning,
            );
        } else {
            // Out of retries: back to scanning, manual connect only
            self.auto_connect_suppressed = true;
            self.send_log(
                &format!("Connection failed: {}", error),
                MessageSeverity::Error,
            );
            self.begin_scan().await;
        }
    }

    fn retry_connect(&mut self) {
        if self.state != LinkState::Connecting {
            return;
        }
        info!("Retrying connection");
        self.spawn_connect();
    }

    fn enable_transmission(&mut self) {
        match self.state {
            LinkState::Ready => {
                self.transmit_timer.start(self.config.transmission_period);
                if let Some(session) = self.session.as_mut() {
                    session.transmission_enabled = true;
                }
                self.set_state(LinkState::Transmitting);
                self.send_log("Transmission started", MessageSeverity::Info);
            }
            LinkState::Transmitting => {}
            LinkState::DiscoveringCapabilities => {
                self.send_log("No writable channel on peer", MessageSeverity::Warning);
            }
            _ => self.send_log("Not connected", MessageSeverity::Warning),
        }
    }

    fn disable_transmission(&mut self) {
        let was_running = self.transmit_timer.is_running();
        self.transmit_timer.stop();
        if let Some(session) = self.session.as_mut() {
            session.transmission_enabled = false;
        }
        if self.state == LinkState::Transmitting {
            self.set_state(LinkState::Ready);
        }
        if was_running {
            self.send_log("Transmission stopped", MessageSeverity::Info);
        }
    }

    async fn transmit_tick(&mut self) {
        let target = self.session.as_ref().and_then(|s| {
            let peer = s.peer.as_ref()?.id.clone();
            let channel = s.capabilities.transmit.clone()?;
            Some((peer, channel))
        });
        let (peer, channel) = match (self.state, target) {
            (LinkState::Transmitting, Some(target)) => target,
            _ => {
                self.transmit_timer.stop();
                return;
            }
        };

        // Always the freshest reading
        let reading = self.aggregator.current_reading();
        let payload = match WirePayload::from_reading(&reading, unix_now()).encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Skipping transmission tick: {}", e);
                return;
            }
        };

        // A tick never outlives its period
        let frames = split_frames(&payload, self.transport.max_frame_len());
        let transport = self.transport.clone();
        let written = timeout(self.config.transmission_period, async {
            for frame in frames {
                transport.write(&peer, &channel, frame).await?;
            }
            Ok::<_, TransportError>(())
        })
        .await
        .unwrap_or_else(|_| {
            Err(TransportError::WriteFailed {
                channel: channel.to_string(),
                reason: "timed out".to_string(),
            })
        });

        if let Err(e) = written {
            warn!("Write to {} failed: {}", channel, e);
            if let Some(session) = self.session.as_mut() {
                session.last_error = Some(e.to_string());
            }
        }
    }

    async fn poll_signal_strength(&mut self) {
        let Some(peer) = self.current_peer().filter(|_| self.state.is_connected()) else {
            self.signal_timer.stop();
            return;
        };

        match self.transport.read_signal_strength(&peer).await {
            Ok(rssi) => {
                if let Some(session) = self.session.as_mut() {
                    session.signal_strength = Some(rssi);
                }
            }
            Err(e) => debug!("Signal strength read failed: {}", e),
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::PeerDiscovered(peer) => {
                if let Some(peer) = self.on_peer_discovered(peer) {
                    self.begin_connect(peer).await;
                }
            }
            TransportEvent::Disconnected { peer, reason } => {
                self.on_unexpected_disconnect(peer, reason);
            }
            TransportEvent::Notification { channel, data } => {
                let subscribed = self
                    .session
                    .as_ref()
                    .and_then(|s| s.capabilities.receive.as_ref())
                    == Some(&channel);
                if subscribed {
                    debug!("{} bytes from {}", data.len(), channel);
                    let _ = self.event_sender.send(AppEvent::PeerData(data));
                } else {
                    debug!("Dropping notification from unsubscribed channel {}", channel);
                }
            }
        }
    }

    fn on_unexpected_disconnect(&mut self, peer: PeerId, reason: String) {
        if self.current_peer().as_ref() != Some(&peer) || !self.state.is_connected() {
            debug!("Ignoring disconnect of {} while {}", peer, self.state);
            return;
        }

        warn!("Link to {} lost: {}", peer, reason);
        self.teardown();
        self.set_state(LinkState::Disconnected);
        self.reconnect_deadline.arm(self.config.reconnect_delay);
        self.send_log(
            &format!(
                "Disconnected ({}). Reconnecting in {}s...",
                reason,
                self.config.reconnect_delay.as_secs_f64()
            ),
            MessageSeverity::Warning,
        );
    }

    async fn reconnect(&mut self) {
        if self.state != LinkState::Disconnected {
            return;
        }
        info!("Reconnecting");
        self.retry_used = false;
        self.auto_connect_suppressed = false;
        self.begin_scan().await;
    }

    async fn disconnect(&mut self) {
        if self.state == LinkState::Idle {
            return;
        }

        if self.state == LinkState::Scanning {
            self.halt_scan().await;
        }
        if self.state.is_connected() || self.state == LinkState::Connecting {
            if let Some(peer) = self.current_peer() {
                if let Err(e) = self.transport.disconnect(&peer).await {
                    warn!("Transport disconnect failed: {}", e);
                }
            }
        }

        self.teardown();
        self.reconnect_deadline.disarm();
        self.set_state(LinkState::Disconnected);
        self.send_log("Disconnected", MessageSeverity::Info);
    }

    async fn reset(&mut self) {
        if self.state != LinkState::Idle {
            self.disconnect().await;
        }
        self.discovered.clear();
        self.set_state(LinkState::Idle);
    }

    /// Cancel every session timer, invalidate in-flight operations and
    /// drop the session together with its transmit channel
    fn teardown(&mut self) {
        self.transmit_timer.stop();
        self.signal_timer.stop();
        self.scan_deadline.disarm();
        self.retry_deadline.disarm();
        self.attempt += 1;

        if let Some(mut session) = self.session.take() {
            session.capabilities.transmit = None;
        }
    }

    fn current_peer(&self) -> Option<PeerId> {
        self.session.as_ref().and_then(|s| s.peer_id().cloned())
    }

    fn has_transmit_channel(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.capabilities.transmit.is_some())
    }

    fn set_state(&mut self, state: LinkState) {
        if self.state == state {
            return;
        }
        info!("Link state: {} -> {}", self.state, state);
        self.state = state;
        let _ = self.event_sender.send(AppEvent::LinkState(state));
    }

    fn publish_snapshot(&self) {
        let snapshot = LinkSnapshot {
            state: self.state,
            session: self.session.clone(),
            discovered: self.discovered.clone(),
        };
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn send_log(&self, message: &str, severity: MessageSeverity) {
        let _ = self
            .event_sender
            .send(AppEvent::LogMessage(StatusMessage::new(message, severity)));
    }
}
