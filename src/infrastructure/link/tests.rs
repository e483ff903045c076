use super::*;
use crate::domain::aggregator::SensorAggregator;
use crate::domain::error::LinkError;
use crate::domain::models::{
    AppEvent, Channel, ChannelId, ChannelProperties, DiscoveredPeer, LinkState, PeerId,
};
use crate::domain::payload::WirePayload;
use crate::domain::settings::LinkConfig;
use crate::domain::throttle::LookupThrottle;
use crate::infrastructure::geocoding::CoordinateGeocoder;
use crate::infrastructure::transport::{SimulatedPeer, SimulatedTransport, TransportEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

const PEER: &str = "AA:01";

struct Harness {
    handle: LinkHandle,
    events: mpsc::UnboundedReceiver<AppEvent>,
    transport: SimulatedTransport,
    aggregator: SensorAggregator,
}

impl Harness {
    fn new(peers: Vec<SimulatedPeer>, auto_connect_filter: Option<&str>) -> Self {
        let config = LinkConfig {
            auto_connect_filter: auto_connect_filter.map(str::to_string),
            ..LinkConfig::default()
        };
        let aggregator =
            SensorAggregator::new(Arc::new(CoordinateGeocoder), LookupThrottle::default());
        let transport = SimulatedTransport::new(peers);
        let manager =
            LinkSessionManager::create(Arc::new(transport.clone()), aggregator.clone(), config);
        let (handle, events) = manager.activate();

        Self {
            handle,
            events,
            transport,
            aggregator,
        }
    }

    /// One compass display peer, auto-connected by name
    fn auto_connecting() -> Self {
        Self::new(
            vec![SimulatedPeer::compass_display(PEER, "Compass One")],
            Some("Compass"),
        )
    }

    fn state(&self) -> LinkState {
        self.handle.snapshot().state
    }

    async fn wait_for(&self, state: LinkState) {
        let mut rx = self.handle.watch();
        timeout(Duration::from_secs(120), rx.wait_for(|s| s.state == state))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {}", state))
            .expect("link actor stopped");
    }

    async fn ready(&self) {
        self.handle.start_scanning().await.unwrap();
        self.wait_for(LinkState::Ready).await;
    }

    async fn transmitting(&self) {
        self.ready().await;
        self.handle.enable_transmission().await.unwrap();
        assert_eq!(self.state(), LinkState::Transmitting);
    }

    fn messages(&mut self) -> Vec<String> {
        let mut messages = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let AppEvent::LogMessage(msg) = event {
                messages.push(msg.message);
            }
        }
        messages
    }

    fn has_message(&mut self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

fn peer_id() -> PeerId {
    PeerId::from(PEER)
}

/// A display that only notifies and exposes nothing to write to
fn notify_only_peer() -> SimulatedPeer {
    let mut peer = SimulatedPeer::compass_display(PEER, "Compass One");
    peer.channels = vec![Channel {
        id: "status-tx".into(),
        properties: ChannelProperties {
            notify: true,
            ..Default::default()
        },
    }];
    peer
}

#[tokio::test(start_paused = true)]
async fn test_auto_connect_reaches_ready() {
    let h = Harness::auto_connecting();
    h.ready().await;

    let snapshot = h.handle.snapshot();
    let session = snapshot.session.expect("session while ready");
    assert_eq!(session.peer_id(), Some(&peer_id()));
    assert_eq!(
        session.capabilities.transmit,
        Some(ChannelId::from("heading-rx"))
    );
    assert_eq!(
        session.capabilities.receive,
        Some(ChannelId::from("status-tx"))
    );
    assert!(!session.transmission_enabled);

    assert!(!h.transport.is_scanning());
    assert_eq!(h.transport.connected_peer(), Some(peer_id()));
    assert_eq!(h.transport.subscriptions(), vec![ChannelId::from("status-tx")]);
}

#[tokio::test(start_paused = true)]
async fn test_discovered_peers_are_deduplicated_by_identifier() {
    let h = Harness::new(vec![SimulatedPeer::compass_display(PEER, "Compass One")], None);
    h.handle.start_scanning().await.unwrap();
    sleep(Duration::from_millis(500)).await;

    h.transport
        .inject(TransportEvent::PeerDiscovered(DiscoveredPeer {
            id: peer_id(),
            name: Some("Compass One".to_string()),
            signal_strength: -40,
        }));
    // Same name, different identifier: a distinct peer
    h.transport
        .inject(TransportEvent::PeerDiscovered(DiscoveredPeer {
            id: PeerId::from("AA:02"),
            name: Some("Compass One".to_string()),
            signal_strength: -70,
        }));
    settle().await;

    let discovered = h.handle.snapshot().discovered;
    let ids: Vec<&str> = discovered.iter().map(|p| p.id.0.as_str()).collect();
    assert_eq!(ids, vec!["AA:01", "AA:02"]);
    assert_eq!(discovered[0].signal_strength, -40);
    assert_eq!(h.state(), LinkState::Scanning);
}

#[tokio::test(start_paused = true)]
async fn test_new_scan_clears_discovered_list() {
    let h = Harness::new(vec![SimulatedPeer::compass_display(PEER, "Compass One")], None);
    h.handle.start_scanning().await.unwrap();
    sleep(Duration::from_millis(500)).await;
    assert_eq!(h.handle.snapshot().discovered.len(), 1);

    h.handle.start_scanning().await.unwrap();
    assert!(h.handle.snapshot().discovered.is_empty());
    assert_eq!(h.transport.scans_started(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_scan_timeout_reports_no_peers() {
    let mut h = Harness::new(vec![], Some("Compass"));
    h.handle.start_scanning().await.unwrap();
    assert_eq!(h.state(), LinkState::Scanning);

    sleep(Duration::from_secs(14)).await;
    assert_eq!(h.state(), LinkState::Scanning);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(h.state(), LinkState::Disconnected);
    assert!(!h.transport.is_scanning());
    assert!(h.has_message("No peers found"));
}

#[tokio::test(start_paused = true)]
async fn test_stop_scanning_returns_to_idle() {
    let h = Harness::new(vec![SimulatedPeer::compass_display(PEER, "Compass One")], None);
    h.handle.start_scanning().await.unwrap();
    h.handle.stop_scanning().await.unwrap();

    assert_eq!(h.state(), LinkState::Idle);
    assert!(!h.transport.is_scanning());

    // The scan timeout was cancelled with the scan
    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.state(), LinkState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_manual_connect_requires_scanning() {
    let mut h = Harness::new(vec![SimulatedPeer::compass_display(PEER, "Compass One")], None);
    h.handle.connect(peer_id()).await.unwrap();
    assert_eq!(h.state(), LinkState::Idle);
    assert!(h.has_message("Cannot connect while Idle"));

    h.handle.start_scanning().await.unwrap();
    sleep(Duration::from_millis(500)).await;
    h.handle.connect(peer_id()).await.unwrap();
    h.wait_for(LinkState::Ready).await;
    assert_eq!(h.transport.connect_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connect_retry_succeeds_after_backoff() {
    let h = Harness::auto_connecting();
    h.transport.fail_next_connects(1);
    h.handle.start_scanning().await.unwrap();

    // First attempt at ~0.3s fails; retry waits out the 3s backoff
    sleep(Duration::from_secs(3)).await;
    assert_eq!(h.state(), LinkState::Connecting);
    assert_eq!(h.transport.connect_calls(), 1);

    h.wait_for(LinkState::Ready).await;
    assert_eq!(h.transport.connect_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_second_connect_failure_returns_to_scanning_without_retry() {
    let mut h = Harness::auto_connecting();
    h.transport.fail_next_connects(2);
    h.handle.start_scanning().await.unwrap();

    sleep(Duration::from_secs(1)).await;
    assert_eq!(h.transport.connect_calls(), 1);
    assert!(h.has_message("Retrying in 3s"));

    sleep(Duration::from_secs(3)).await;
    assert_eq!(h.transport.connect_calls(), 2);
    assert_eq!(h.state(), LinkState::Scanning);
    assert_eq!(h.transport.scans_started(), 2);

    // The peer is seen again but no further automatic attempt is made
    sleep(Duration::from_secs(10)).await;
    assert_eq!(h.transport.connect_calls(), 2);
    assert_eq!(h.handle.snapshot().discovered.len(), 1);

    // An explicit connect still works
    h.handle.connect(peer_id()).await.unwrap();
    h.wait_for(LinkState::Ready).await;
    assert_eq!(h.transport.connect_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_discovery_failure_is_retried_like_connect_failure() {
    let h = Harness::auto_connecting();
    h.transport.fail_next_discoveries(1);
    h.ready().await;
    assert_eq!(h.transport.connect_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_missing_writable_channel_is_a_soft_failure() {
    let mut h = Harness::new(vec![notify_only_peer()], Some("Compass"));
    h.handle.start_scanning().await.unwrap();
    h.wait_for(LinkState::DiscoveringCapabilities).await;

    sleep(Duration::from_secs(10)).await;
    assert_eq!(h.state(), LinkState::DiscoveringCapabilities);
    let session = h.handle.snapshot().session.unwrap();
    assert!(session
        .last_error
        .unwrap()
        .contains("no writable channel"));
    assert!(h.has_message("No writable channel"));

    h.handle.enable_transmission().await.unwrap();
    sleep(Duration::from_secs(1)).await;
    assert_eq!(h.state(), LinkState::DiscoveringCapabilities);
    assert!(h.transport.writes().is_empty());
    assert_eq!(h.transport.connect_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_new_scan_releases_peer_without_writable_channel() {
    let mut h = Harness::new(vec![notify_only_peer()], Some("Compass"));
    h.handle.start_scanning().await.unwrap();
    h.wait_for(LinkState::DiscoveringCapabilities).await;
    h.messages();

    h.handle.start_scanning().await.unwrap();
    assert_eq!(h.state(), LinkState::Scanning);
    assert!(h.handle.snapshot().session.is_none());
    assert!(h.transport.connected_peer().is_none());
    assert_eq!(h.transport.disconnects(), vec![peer_id()]);
    assert_eq!(h.transport.scans_started(), 2);
    assert!(!h.has_message("Cannot start scanning"));

    // Polling stopped with the link
    let reads = h.transport.signal_reads();
    sleep(Duration::from_millis(200)).await;
    assert_eq!(h.transport.signal_reads(), reads);

    // Seen again and connected afresh
    h.wait_for(LinkState::DiscoveringCapabilities).await;
    assert_eq!(h.transport.connect_calls(), 2);
    assert_eq!(h.transport.connected_peer(), Some(peer_id()));
}

#[tokio::test(start_paused = true)]
async fn test_late_connect_success_for_abandoned_peer_is_released() {
    let other = PeerId::from("AA:02");
    let h = Harness::new(
        vec![
            SimulatedPeer::compass_display(PEER, "Compass One"),
            SimulatedPeer::compass_display("AA:02", "Compass Two"),
        ],
        None,
    );
    h.transport.set_connect_latency(Duration::from_secs(2));
    h.handle.start_scanning().await.unwrap();
    sleep(Duration::from_millis(500)).await;

    // Abandon AA:01 mid-connect and move on to AA:02
    h.handle.connect(peer_id()).await.unwrap();
    h.handle.disconnect().await.unwrap();
    h.handle.start_scanning().await.unwrap();
    sleep(Duration::from_millis(500)).await;
    h.handle.connect(other.clone()).await.unwrap();

    // AA:01 answers at 2.5s while AA:02 is still connecting
    sleep(Duration::from_millis(1600)).await;
    assert_eq!(h.state(), LinkState::Connecting);
    assert_eq!(h.transport.disconnects(), vec![peer_id(), peer_id()]);

    h.wait_for(LinkState::Ready).await;
    assert_eq!(h.transport.connected_peer(), Some(other.clone()));
    assert!(!h.transport.disconnects().contains(&other));
}

#[tokio::test(start_paused = true)]
async fn test_enable_transmission_when_not_connected() {
    let mut h = Harness::auto_connecting();
    h.handle.enable_transmission().await.unwrap();
    assert_eq!(h.state(), LinkState::Idle);
    assert!(h.has_message("Not connected"));
}

#[tokio::test(start_paused = true)]
async fn test_transmission_sends_fresh_readings_from_the_first_tick() {
    let h = Harness::auto_connecting();
    h.ready().await;

    h.aggregator.ingest_heading(90.0, 92.0);
    h.handle.enable_transmission().await.unwrap();
    settle().await;

    // First tick fires immediately
    let writes = h.transport.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, ChannelId::from("heading-rx"));
    let payload = WirePayload::decode(&writes[0].1).unwrap();
    assert_eq!(payload.true_heading, 92.0);
    assert_eq!(payload.heading_direction, "E");
    assert_eq!(payload.heading_degrees, "92°");

    // Next tick re-samples the reading
    h.aggregator.ingest_heading(180.0, 181.0);
    sleep(Duration::from_millis(250)).await;
    let writes = h.transport.writes();
    assert_eq!(writes.len(), 2);
    let payload = WirePayload::decode(&writes[1].1).unwrap();
    assert_eq!(payload.true_heading, 181.0);
    assert_eq!(payload.heading_direction, "S");
}

#[tokio::test(start_paused = true)]
async fn test_tick_with_non_finite_reading_is_skipped() {
    let h = Harness::auto_connecting();
    h.ready().await;

    h.aggregator.ingest_heading(f64::NAN, 0.0);
    h.handle.enable_transmission().await.unwrap();
    settle().await;
    assert!(h.transport.writes().is_empty());
    assert_eq!(h.state(), LinkState::Transmitting);

    h.aggregator.ingest_heading(10.0, 12.0);
    sleep(Duration::from_millis(250)).await;
    let writes = h.transport.writes();
    assert_eq!(writes.len(), 1);
    let payload = WirePayload::decode(&writes[0].1).unwrap();
    assert_eq!(payload.magnetic_heading, 10.0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_write_does_not_hold_up_commands() {
    let h = Harness::auto_connecting();
    h.ready().await;
    h.transport.set_write_latency(Duration::from_secs(30));
    h.handle.enable_transmission().await.unwrap();
    settle().await;

    timeout(Duration::from_secs(1), h.handle.disable_transmission())
        .await
        .expect("disable held up by a pending write")
        .unwrap();
    assert_eq!(h.state(), LinkState::Ready);
    assert!(h.transport.writes().is_empty());
    let session = h.handle.snapshot().session.unwrap();
    assert!(session.last_error.unwrap().contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn test_disable_transmission_cancels_ticks_and_is_idempotent() {
    let h = Harness::auto_connecting();
    h.transmitting().await;
    sleep(Duration::from_millis(600)).await;

    h.handle.disable_transmission().await.unwrap();
    let sent = h.transport.writes().len();
    assert!(sent >= 3);
    assert_eq!(h.state(), LinkState::Ready);
    assert!(!h.handle.snapshot().session.unwrap().transmission_enabled);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.transport.writes().len(), sent);

    h.handle.disable_transmission().await.unwrap();
    assert_eq!(h.state(), LinkState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_oversized_payload_is_split_into_ordered_frames() {
    let h = Harness::auto_connecting();
    h.transport.set_max_frame_len(Some(40));
    h.transmitting().await;
    settle().await;
    h.handle.disable_transmission().await.unwrap();

    let writes = h.transport.writes();
    assert!(writes.len() > 1);
    assert!(writes.iter().all(|(_, frame)| frame.len() <= 40));

    let joined: Vec<u8> = writes.iter().flat_map(|(_, f)| f.clone()).collect();
    assert!(WirePayload::decode(&joined).is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_write_failure_does_not_drop_the_link() {
    let h = Harness::auto_connecting();
    h.transport.fail_next_writes(1);
    h.transmitting().await;
    sleep(Duration::from_millis(300)).await;

    assert_eq!(h.state(), LinkState::Transmitting);
    assert_eq!(h.transport.writes().len(), 1);
    let session = h.handle.snapshot().session.unwrap();
    assert!(session.last_error.unwrap().contains("not acknowledged"));
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_disconnect_cancels_transmission_and_reconnects_once() {
    let mut h = Harness::auto_connecting();
    h.transmitting().await;
    settle().await;

    h.transport.drop_link("out of range");
    settle().await;
    assert_eq!(h.state(), LinkState::Disconnected);
    assert!(h.handle.snapshot().session.is_none());
    assert!(h.has_message("Reconnecting in 5s"));
    let sent = h.transport.writes().len();

    sleep(Duration::from_secs(4)).await;
    assert_eq!(h.transport.writes().len(), sent);
    assert_eq!(h.transport.scans_started(), 1);

    sleep(Duration::from_millis(1100)).await;
    assert_eq!(h.transport.scans_started(), 2);

    h.wait_for(LinkState::Ready).await;
    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.transport.scans_started(), 2);
    assert_eq!(h.transport.writes().len(), sent);
}

#[tokio::test(start_paused = true)]
async fn test_user_disconnect_never_schedules_reconnect() {
    let h = Harness::auto_connecting();
    h.transmitting().await;

    h.handle.disconnect().await.unwrap();
    assert_eq!(h.state(), LinkState::Disconnected);
    assert!(h.transport.connected_peer().is_none());
    let sent = h.transport.writes().len();

    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.state(), LinkState::Disconnected);
    assert_eq!(h.transport.scans_started(), 1);
    assert_eq!(h.transport.writes().len(), sent);
}

#[tokio::test(start_paused = true)]
async fn test_start_scanning_cancels_pending_reconnect() {
    let h = Harness::new(vec![SimulatedPeer::compass_display(PEER, "Compass One")], None);
    h.handle.start_scanning().await.unwrap();
    sleep(Duration::from_millis(500)).await;
    h.handle.connect(peer_id()).await.unwrap();
    h.wait_for(LinkState::Ready).await;

    h.transport.drop_link("peer reset");
    settle().await;
    h.handle.start_scanning().await.unwrap();
    assert_eq!(h.transport.scans_started(), 2);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(h.transport.scans_started(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_signal_strength_polled_while_connected() {
    let h = Harness::auto_connecting();
    h.ready().await;

    h.transport.set_signal_strength(&peer_id(), -41);
    sleep(Duration::from_millis(2100)).await;
    let session = h.handle.snapshot().session.unwrap();
    assert_eq!(session.signal_strength, Some(-41));

    h.handle.disconnect().await.unwrap();
    let reads = h.transport.signal_reads();
    sleep(Duration::from_secs(10)).await;
    assert_eq!(h.transport.signal_reads(), reads);
}

#[tokio::test(start_paused = true)]
async fn test_notifications_from_receive_channel_reach_presentation() {
    let mut h = Harness::auto_connecting();
    h.ready().await;
    while h.events.try_recv().is_ok() {}

    h.transport.inject(TransportEvent::Notification {
        channel: ChannelId::from("heading-rx"),
        data: b"ignored".to_vec(),
    });
    h.transport.inject(TransportEvent::Notification {
        channel: ChannelId::from("status-tx"),
        data: b"ack".to_vec(),
    });
    settle().await;

    let mut received = Vec::new();
    while let Ok(event) = h.events.try_recv() {
        if let AppEvent::PeerData(data) = event {
            received.push(data);
        }
    }
    assert_eq!(received, vec![b"ack".to_vec()]);
}

#[tokio::test(start_paused = true)]
async fn test_reset_returns_to_idle() {
    let h = Harness::auto_connecting();
    h.transmitting().await;

    h.handle.reset().await.unwrap();
    let snapshot = h.handle.snapshot();
    assert_eq!(snapshot.state, LinkState::Idle);
    assert!(snapshot.session.is_none());
    assert!(snapshot.discovered.is_empty());
    assert!(h.transport.connected_peer().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_state_changes_are_reported_in_order() {
    let mut h = Harness::auto_connecting();
    h.ready().await;

    let mut states = Vec::new();
    while let Ok(event) = h.events.try_recv() {
        if let AppEvent::LinkState(state) = event {
            states.push(state);
        }
    }
    assert_eq!(
        states,
        vec![
            LinkState::Scanning,
            LinkState::Connecting,
            LinkState::DiscoveringCapabilities,
            LinkState::Ready,
        ]
    );
}

#[tokio::test]
async fn test_commands_fail_after_shutdown() {
    let h = Harness::auto_connecting();
    h.handle.shutdown().await.unwrap();
    assert!(matches!(
        h.handle.start_scanning().await,
        Err(LinkError::Closed)
    ));
}
