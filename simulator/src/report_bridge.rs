use anyhow::Result;
use isaccore::stream::ScanReport;
use isaccore::telemetry::MetricsSnapshot;
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::Filter;

fn bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

#[derive(Default)]
struct Published {
    report: Option<ScanReport>,
    metrics: MetricsSnapshot,
}

/// Hosts the read-only HTTP surface: the latest scan report and the counter
/// snapshot, both as JSON.
pub struct ReportBridge {
    state: Arc<RwLock<Published>>,
}

impl ReportBridge {
    pub fn new() -> Self {
        let state = Arc::new(RwLock::new(Published::default()));
        let state_for_filter = state.clone();
        let state_filter = warp::any().map(move || state_for_filter.clone());

        let report_route = warp::path("report")
            .and(warp::get())
            .and(state_filter.clone())
            .map(|state: Arc<RwLock<Published>>| {
                warp::reply::json(&state.read().unwrap().report)
            });

        let metrics_route = warp::path("metrics")
            .and(warp::get())
            .and(state_filter)
            .map(|state: Arc<RwLock<Published>>| {
                warp::reply::json(&state.read().unwrap().metrics)
            });

        let health_route = warp::path("health")
            .and(warp::get())
            .map(|| warp::reply::json(&json!({"status": "ok"})));

        thread::spawn(move || {
            let routes = report_route.or(metrics_route).or(health_route);
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build runtime");
            runtime.block_on(async move {
                warp::serve(routes).run(bind_address()).await;
            });
        });

        Self { state }
    }

    pub fn publish(&self, report: &ScanReport, metrics: MetricsSnapshot) -> Result<()> {
        let mut guard = self.state.write().unwrap();
        guard.report = Some(report.clone());
        guard.metrics = metrics;
        println!(
            "[BRIDGE] cycle {}: {} detections, degraded {}",
            report.cycle_index,
            report.detections.len(),
            report.degraded
        );
        Ok(())
    }

    pub fn publish_status(&self, message: &str) {
        println!("[BRIDGE] {}", message);
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Option<ScanReport> {
        self.state.read().unwrap().report.clone()
    }
}

impl Default for ReportBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_holds_latest_report() {
        let bridge = ReportBridge::new();
        let report = ScanReport {
            cycle_index: 12,
            completed_at: 12 * 307_200,
            detections: Vec::new(),
            degraded: false,
        };
        bridge.publish(&report, MetricsSnapshot::default()).unwrap();
        assert_eq!(bridge.snapshot().unwrap().cycle_index, 12);
    }
}
