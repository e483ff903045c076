use compass_relay::domain::settings::SettingsService;
use compass_relay::domain::throttle::LookupThrottle;
use compass_relay::infrastructure::geocoding::CoordinateGeocoder;
use compass_relay::infrastructure::logging::init_logger;
use compass_relay::infrastructure::sensors::SimulatedSensorFeed;
use compass_relay::infrastructure::transport::{SimulatedPeer, SimulatedTransport};
use compass_relay::presentation::app::RelayApp;
use compass_relay::{LinkSessionManager, SensorAggregator};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_service = SettingsService::new()?;
    let settings = settings_service.get().clone();

    let _logging_guard = init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Starting Compass Relay");
    if !settings_service.path().exists() {
        if let Err(e) = settings_service.save() {
            warn!("Could not write default settings: {}", e);
        } else {
            info!("Wrote default settings to {}", settings_service.path().display());
        }
    }

    let throttle = LookupThrottle::new(
        settings.sensors.lookup_min_interval(),
        settings.sensors.lookup_min_distance_m,
    );
    let aggregator = SensorAggregator::new(Arc::new(CoordinateGeocoder), throttle);
    let _sensors = SimulatedSensorFeed::start(aggregator.clone(), &settings.sensors);

    let transport = Arc::new(SimulatedTransport::new(vec![
        SimulatedPeer::compass_display("C0:FF:EE:00:00:01", "Compass Display"),
    ]));
    let (link, events) =
        LinkSessionManager::create(transport, aggregator.clone(), settings.link.to_config())
            .activate();

    RelayApp::new(aggregator, link, events, &settings).run().await
}
