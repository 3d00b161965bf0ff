//! Prometheus-compatible metrics for the MCP endpoint
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed by the binary.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// JSON-RPC requests handled (counter, labels: method, outcome).
pub const RPC_REQUESTS_TOTAL: &str = "huddle_rpc_requests_total";
/// Live sessions (gauge, 0 or 1).
pub const SESSIONS_ACTIVE: &str = "huddle_sessions_active";
/// Sessions ever created (counter).
pub const SESSIONS_CREATED_TOTAL: &str = "huddle_sessions_created_total";
/// Notifications enqueued for push (counter).
pub const PUSH_EVENTS_TOTAL: &str = "huddle_push_events_total";

/// Install the global Prometheus recorder and return the handle that renders `/metrics`.
pub fn install_recorder() -> crate::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| crate::Error::Server(format!("failed to install metrics recorder: {}", e)))?;
    tracing::info!("Prometheus metrics recorder installed");
    Ok(handle)
}

/// Record one dispatched JSON-RPC request
pub fn record_rpc_request(method: &'static str, outcome: &'static str) {
    metrics::counter!(RPC_REQUESTS_TOTAL, "method" => method, "outcome" => outcome).increment(1);
}

pub fn record_session_created() {
    metrics::counter!(SESSIONS_CREATED_TOTAL).increment(1);
    metrics::gauge!(SESSIONS_ACTIVE).set(1.0);
}

pub fn record_session_closed() {
    metrics::gauge!(SESSIONS_ACTIVE).set(0.0);
}

pub fn record_push_event() {
    metrics::counter!(PUSH_EVENTS_TOTAL).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_without_global_install() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_rpc_request("tools/call", "ok");
            record_session_created();
        });

        let output = handle.render();
        assert!(output.contains(RPC_REQUESTS_TOTAL));
        assert!(output.contains("method=\"tools/call\""));
        assert!(output.contains(SESSIONS_ACTIVE));
    }

    #[test]
    fn test_metric_names_share_prefix() {
        for name in [
            RPC_REQUESTS_TOTAL,
            SESSIONS_ACTIVE,
            SESSIONS_CREATED_TOTAL,
            PUSH_EVENTS_TOTAL,
        ] {
            assert!(name.starts_with("huddle_"));
            assert!(!name.contains('-'));
        }
    }
}
