use std::time::Duration;
use tokio::time;
use tracing::{debug, info, instrument, warn};

use crate::services::DashboardService;

/// Periodically refreshes the dashboard for whatever location is selected at tick time.
#[instrument(skip(dashboard), fields(interval_minutes = %interval_minutes))]
pub async fn start_refresh_scheduler(dashboard: DashboardService, interval_minutes: u64) {
    let mut interval = time::interval(Duration::from_secs(interval_minutes.max(1) * 60));

    info!("Refresh scheduler started with {} minute interval", interval_minutes);

    loop {
        interval.tick().await;
        debug!("Scheduler tick - refreshing dashboard");

        let outcome = dashboard.refresh_selected().await;
        if outcome.committed == 0 {
            warn!("Scheduled refresh committed no panels");
            continue;
        }

        debug!("Scheduled refresh committed {} panels", outcome.committed);
        if let Some(current) = dashboard.snapshot().await.current.data() {
            info!(
                "Current conditions at {}: {:.1}°C, {}",
                current.location, current.temperature_c, current.description
            );
        }
    }
}
