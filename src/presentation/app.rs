use crate::domain::aggregator::SensorAggregator;
use crate::domain::models::{
    AppEvent, FusedReading, LinkSnapshot, LinkState, MessageSeverity, StatusMessage,
};
use crate::domain::settings::Settings;
use crate::infrastructure::link::LinkHandle;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Console front-end: shows the fused reading and link status, and turns
/// transmission on once the link is ready
pub struct RelayApp {
    aggregator: SensorAggregator,
    link: LinkHandle,
    events: mpsc::UnboundedReceiver<AppEvent>,

    // State
    link_state: LinkState,
    status_message: Option<StatusMessage>,
    auto_transmit: bool,
}

impl RelayApp {
    pub fn new(
        aggregator: SensorAggregator,
        link: LinkHandle,
        events: mpsc::UnboundedReceiver<AppEvent>,
        settings: &Settings,
    ) -> Self {
        Self {
            aggregator,
            link,
            events,
            link_state: LinkState::Idle,
            status_message: None,
            auto_transmit: settings.link.auto_transmit,
        }
    }

    /// Run until Ctrl-C
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        tokio::pin!(shutdown);

        self.link.start_scanning().await?;

        let mut refresh = interval(REFRESH_INTERVAL);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down");
                    break;
                }
                Some(event) = self.events.recv() => self.handle_event(event).await?,
                _ = refresh.tick() => self.render(),
            }
        }

        self.link.shutdown().await?;
        Ok(())
    }

    async fn handle_event(&mut self, event: AppEvent) -> anyhow::Result<()> {
        match event {
            AppEvent::LinkState(state) => {
                self.link_state = state;
                if state == LinkState::Ready && self.auto_transmit {
                    self.link.enable_transmission().await?;
                }
            }
            AppEvent::PeerDiscovered(peer) => {
                info!(
                    "Found {} ({}, {} dBm)",
                    peer.display_name(),
                    peer.id,
                    peer.signal_strength
                );
            }
            AppEvent::PeerData(data) => {
                info!("Peer says: {}", String::from_utf8_lossy(&data));
            }
            AppEvent::LogMessage(msg) => {
                match msg.severity {
                    MessageSeverity::Error => error!("{}", msg.message),
                    MessageSeverity::Warning => warn!("{}", msg.message),
                    MessageSeverity::Info | MessageSeverity::Success => info!("{}", msg.message),
                }
                self.status_message = Some(msg);
            }
        }
        Ok(())
    }

    fn render(&self) {
        let line = status_line(
            &self.aggregator.current_reading(),
            self.aggregator.address().as_deref(),
            &self.link.snapshot(),
        );
        match &self.status_message {
            Some(status) => println!("{} | {}", line, status.message),
            None => println!("{}", line),
        }
    }
}

/// One-line summary of the reading and the link
pub fn status_line(
    reading: &FusedReading,
    address: Option<&str>,
    link: &LinkSnapshot,
) -> String {
    let level = if reading.is_flat() { "flat" } else { "tilted" };
    let peer = link
        .session
        .as_ref()
        .and_then(|s| s.peer.as_ref())
        .map(|p| format!(" to {}", p.display_name()))
        .unwrap_or_default();
    let rssi = link
        .session
        .as_ref()
        .and_then(|s| s.signal_strength)
        .map(|r| format!(" ({} dBm)", r))
        .unwrap_or_default();

    format!(
        "{:>2} {:>4} [{}] {:.5}, {:.5} {} | {}{}{}",
        reading.octant().label(),
        reading.heading_degrees(),
        level,
        reading.latitude,
        reading.longitude,
        address.unwrap_or("locating..."),
        link.state,
        peer,
        rssi
    )
}
