//! Prometheus metrics exposition
//!
//! Metrics are emitted through the `metrics` facade by the library crates:
//!
//! - `mcp_tool_calls_total` (counter): labels `tool`, `outcome`
//! - `mcp_tool_call_duration_seconds` (histogram): label `tool`
//! - `oauth_token_exchanges_total` (counter): label `outcome`
//! - `upstream_requests_total` (counter): labels `method`, `status`
//! - `upstream_auth_retries_total` (counter)
//!
//! This module installs the recorder that renders them on `/metrics`.

use anyhow::Context;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Bucket boundaries for tool call latency, 5ms to the 30s upstream timeout.
const TOOL_CALL_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

fn builder() -> anyhow::Result<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("mcp_tool_call_duration_seconds".to_string()),
            TOOL_CALL_BUCKETS,
        )
        .context("failed to set histogram buckets")
}

/// Install the global Prometheus recorder and return a handle for rendering.
///
/// Must run before any metric is emitted; earlier emissions are dropped.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    builder()?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}
