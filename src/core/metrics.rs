use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) const LLM_REQUESTS_TOTAL: &str = "tutor_llm_requests_total";
pub(crate) const LLM_REQUEST_DURATION: &str = "tutor_llm_request_duration_seconds";
pub(crate) const CHAT_TURNS_TOTAL: &str = "tutor_chat_turns_total";
pub(crate) const SESSIONS_CREATED_TOTAL: &str = "tutor_sessions_created_total";
pub(crate) const SESSIONS_EXPIRED_TOTAL: &str = "tutor_sessions_expired_total";

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }
    if PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);

    metrics::describe_counter!(LLM_REQUESTS_TOTAL, "LLM provider calls by operation and outcome");
    metrics::describe_histogram!(LLM_REQUEST_DURATION, "LLM provider call latency");
    metrics::describe_counter!(CHAT_TURNS_TOTAL, "Completed student/tutor turns");
    metrics::describe_counter!(SESSIONS_CREATED_TOTAL, "Tutoring sessions created");
    metrics::describe_counter!(SESSIONS_EXPIRED_TOTAL, "Idle sessions expired by the sweeper");
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
