//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `http_rate_limited_total` (counter): rejected requests by reason
//! - `http_compressed_bytes_saved_total` (counter): bytes removed by gzip
//! - `events_published_total` (counter): events by source
//! - `realtime_connections` (gauge): open socket clients
//!
//! Recording is a no-op until a recorder is installed, so tests and the CLI
//! never need to set one up.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, elapsed: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(elapsed.as_secs_f64());
}

/// `reason` is a fixed label; client addresses belong in logs, not series.
pub fn record_rate_limited(reason: &'static str) {
    counter!("http_rate_limited_total", "reason" => reason).increment(1);
}

pub fn record_compression(original: usize, compressed: usize) {
    counter!("http_compressed_bytes_saved_total")
        .increment(original.saturating_sub(compressed) as u64);
}

pub fn record_event_published(source: &str) {
    counter!("events_published_total", "source" => source.to_string()).increment(1);
}

pub fn record_realtime_connection(delta: f64) {
    gauge!("realtime_connections").increment(delta);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_series_do_not_grow_per_client() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            for _ in 0..3 {
                record_rate_limited("rps_limit");
            }
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"http_rate_limited_total{reason="rps_limit"} 3"#));
        assert_eq!(rendered.matches("http_rate_limited_total{").count(), 1);
    }
}
