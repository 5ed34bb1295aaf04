// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use trueframe_core::result::ConfidenceLevel;
use trueframe_core::signal::MethodId;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("metrics server failed: {0}")]
    Server(std::io::Error),
}

#[derive(Debug, Default)]
struct TelemetryState {
    evaluations_total: BTreeMap<String, u64>,
    detector_timeouts_total: BTreeMap<String, u64>,
    detector_errors_total: BTreeMap<String, u64>,
    attestation_rejects_total: BTreeMap<String, u64>,
}

/// Process-wide counters. Cloning shares the underlying state; keys are
/// kept sorted so `render` output is stable.
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    state: Arc<Mutex<TelemetryState>>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_evaluation(&self, level: ConfidenceLevel) {
        let mut guard = self.state.lock();
        let entry = guard
            .evaluations_total
            .entry(level.as_str().to_string())
            .or_insert(0);
        *entry = entry.saturating_add(1);
    }

    pub fn record_detector_timeout(&self, method: MethodId) {
        let mut guard = self.state.lock();
        let entry = guard
            .detector_timeouts_total
            .entry(method.as_str().to_string())
            .or_insert(0);
        *entry = entry.saturating_add(1);
    }

    pub fn record_detector_error(&self, method: MethodId) {
        let mut guard = self.state.lock();
        let entry = guard
            .detector_errors_total
            .entry(method.as_str().to_string())
            .or_insert(0);
        *entry = entry.saturating_add(1);
    }

    pub fn record_attestation_reject(&self, reason: &str) {
        let mut guard = self.state.lock();
        let entry = guard
            .attestation_rejects_total
            .entry(reason.to_string())
            .or_insert(0);
        *entry = entry.saturating_add(1);
    }

    /// Prometheus text exposition of all counters.
    pub fn render(&self) -> String {
        let guard = self.state.lock();
        let mut out = String::new();
        out.push_str("# TYPE trueframe_evaluations_total counter\n");
        for (level, value) in &guard.evaluations_total {
            let _ = writeln!(
                out,
                "trueframe_evaluations_total{{level=\"{}\"}} {}",
                level, value
            );
        }
        out.push_str("# TYPE trueframe_detector_timeouts_total counter\n");
        for (method, value) in &guard.detector_timeouts_total {
            let _ = writeln!(
                out,
                "trueframe_detector_timeouts_total{{method=\"{}\"}} {}",
                method, value
            );
        }
        out.push_str("# TYPE trueframe_detector_errors_total counter\n");
        for (method, value) in &guard.detector_errors_total {
            let _ = writeln!(
                out,
                "trueframe_detector_errors_total{{method=\"{}\"}} {}",
                method, value
            );
        }
        out.push_str("# TYPE trueframe_attestation_rejects_total counter\n");
        for (reason, value) in &guard.attestation_rejects_total {
            let _ = writeln!(
                out,
                "trueframe_attestation_rejects_total{{reason=\"{}\"}} {}",
                reason, value
            );
        }
        out
    }

    /// Minimal HTTP listener serving `GET /metrics`.
    pub async fn spawn_metrics_server(
        self: Arc<Self>,
        addr: SocketAddr,
    ) -> Result<tokio::task::JoinHandle<()>, TelemetryError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(TelemetryError::Server)?;
        Ok(tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((mut socket, _)) => {
                        let telemetry = self.clone();
                        tokio::spawn(async move {
                            let mut buf = vec![0_u8; 2048];
                            match socket.read(&mut buf).await {
                                Ok(n) if n > 0 => {
                                    let req = String::from_utf8_lossy(&buf[..n]);
                                    let (status, body) = if req.starts_with("GET /metrics ") {
                                        ("200 OK", telemetry.render())
                                    } else {
                                        ("404 Not Found", "not found".to_string())
                                    };
                                    let response = format!(
                                        "HTTP/1.1 {status}\r\ncontent-type: text/plain; version=0.0.4\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                                        body.len(), body
                                    );
                                    let _ = socket.write_all(response.as_bytes()).await;
                                }
                                Ok(_) => {}
                                Err(err) => {
                                    tracing::warn!(error=%err, "metrics socket read failed");
                                }
                            }
                        });
                    }
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) => {
                        tracing::error!(error=%err, "metrics server accept failed");
                        break;
                    }
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_recorded_counters() {
        let telemetry = Telemetry::new();
        telemetry.record_evaluation(ConfidenceLevel::High);
        telemetry.record_evaluation(ConfidenceLevel::High);
        telemetry.record_detector_timeout(MethodId::SurfaceTexture);
        telemetry.record_attestation_reject("counter_replayed");

        let out = telemetry.render();
        assert!(out.contains("trueframe_evaluations_total{level=\"high\"} 2"));
        assert!(out.contains("trueframe_detector_timeouts_total{method=\"surface_texture\"} 1"));
        assert!(out.contains("trueframe_attestation_rejects_total{reason=\"counter_replayed\"} 1"));
    }

    #[test]
    fn clones_share_state() {
        let telemetry = Telemetry::new();
        let clone = telemetry.clone();
        clone.record_detector_error(MethodId::Depth);
        assert!(telemetry
            .render()
            .contains("trueframe_detector_errors_total{method=\"depth\"} 1"));
    }

    #[tokio::test]
    async fn metrics_server_serves_render() {
        let telemetry = Arc::new(Telemetry::new());
        telemetry.record_evaluation(ConfidenceLevel::Medium);
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let bound = listener.local_addr().unwrap();
        drop(listener);
        let handle = telemetry.clone().spawn_metrics_server(bound).await.unwrap();

        let mut stream = tokio::net::TcpStream::connect(bound).await.unwrap();
        stream
            .write_all(b"GET /metrics HTTP/1.1\r\nhost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        let text = String::from_utf8_lossy(&response);
        assert!(text.starts_with("HTTP/1.1 200 OK"));
        assert!(text.contains("trueframe_evaluations_total{level=\"medium\"} 1"));
        handle.abort();
    }
}
