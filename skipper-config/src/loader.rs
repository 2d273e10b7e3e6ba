//! Loads [`Config`] from an optional TOML file, overlaid with CLI flags.
//!
//! This mirrors `motya::app_context::AppContext::load_config` /
//! `apply_cli`: the file sets the baseline, explicit CLI flags win, and the
//! merged result is validated once before anything else starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cli::Cli;
use crate::config::{Config, PassiveHealthCheckConfig, SchedulerDefaults};
use crate::error::ConfigError;

/// The serde-facing shape of the TOML file. Durations are plain
/// milliseconds rather than `std::time::Duration` directly, so the format
/// stays simple and doesn't depend on a human-duration crate for this
/// core (a shell wrapping skipper is free to layer that on).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    source_poll_timeout_ms: Option<u64>,
    max_loopbacks: Option<u32>,
    default_http_status: Option<u16>,
    ignore_trailing_slash: Option<bool>,
    idle_connections_per_host: Option<usize>,
    close_idle_conns_period_ms: Option<u64>,
    timeout_backend_ms: Option<u64>,
    response_header_timeout_backend_ms: Option<u64>,
    expect_continue_timeout_backend_ms: Option<u64>,
    keep_alive_backend_ms: Option<u64>,
    tls_handshake_timeout_backend_ms: Option<u64>,
    backend_flush_interval_ms: Option<u64>,
    experimental_upgrade: Option<bool>,
    enable_passive_health_check: Option<bool>,
    passive_health_check: Option<RawPassiveHealthCheck>,
    scheduler: Option<RawScheduler>,
    listen_addr: Option<String>,
    admin_listen_addr: Option<String>,
    threads_per_service: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPassiveHealthCheck {
    period_ms: Option<u64>,
    min_requests: Option<u32>,
    failure_rate_threshold: Option<f64>,
    scale: Option<f64>,
    min_drop_probability: Option<f64>,
    max_drop_probability: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawScheduler {
    max_concurrency: Option<usize>,
    max_queue_size: Option<usize>,
    timeout_ms: Option<u64>,
}

/// Reads `path` (if given), applies CLI overrides, validates, and returns a
/// ready-to-use [`Config`]. Returns the default configuration unchanged when
/// no file path was given and no relevant CLI flag was set.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    let raw = match &cli.config {
        Some(path) => read_raw(path)?,
        None => RawConfig::default(),
    };

    let mut config = apply_raw(Config::default(), raw);
    apply_cli(&mut config, cli);

    config.validate()?;
    Ok(config)
}

fn read_raw(path: &Path) -> Result<RawConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_raw(mut config: Config, raw: RawConfig) -> Config {
    macro_rules! dur_ms {
        ($field:expr) => {
            $field.map(Duration::from_millis)
        };
    }

    if let Some(v) = dur_ms!(raw.source_poll_timeout_ms) {
        config.source_poll_timeout = v;
    }
    if let Some(v) = raw.max_loopbacks {
        config.max_loopbacks = v;
    }
    if let Some(v) = raw.default_http_status {
        config.default_http_status = v;
    }
    if let Some(v) = raw.ignore_trailing_slash {
        config.ignore_trailing_slash = v;
    }
    if let Some(v) = raw.idle_connections_per_host {
        config.idle_connections_per_host = v;
    }
    if let Some(v) = dur_ms!(raw.close_idle_conns_period_ms) {
        config.close_idle_conns_period = v;
    }
    if let Some(v) = dur_ms!(raw.timeout_backend_ms) {
        config.timeout_backend = v;
    }
    if let Some(v) = dur_ms!(raw.response_header_timeout_backend_ms) {
        config.response_header_timeout_backend = v;
    }
    if let Some(v) = dur_ms!(raw.expect_continue_timeout_backend_ms) {
        config.expect_continue_timeout_backend = v;
    }
    if let Some(v) = dur_ms!(raw.keep_alive_backend_ms) {
        config.keep_alive_backend = v;
    }
    if let Some(v) = dur_ms!(raw.tls_handshake_timeout_backend_ms) {
        config.tls_handshake_timeout_backend = v;
    }
    if let Some(ms) = raw.backend_flush_interval_ms {
        config.backend_flush_interval = Some(Duration::from_millis(ms));
    }
    if let Some(v) = raw.experimental_upgrade {
        config.experimental_upgrade = v;
    }
    if let Some(v) = raw.enable_passive_health_check {
        config.enable_passive_health_check = v;
    }
    if let Some(phc) = raw.passive_health_check {
        apply_passive_health_check(&mut config.passive_health_check, phc);
    }
    if let Some(sched) = raw.scheduler {
        apply_scheduler(&mut config.scheduler_defaults, sched);
    }
    if let Some(v) = raw.listen_addr {
        config.listen_addr = v;
    }
    if let Some(v) = raw.admin_listen_addr {
        config.admin_listen_addr = Some(v);
    }
    if let Some(v) = raw.threads_per_service {
        config.threads_per_service = v;
    }

    config
}

fn apply_passive_health_check(target: &mut PassiveHealthCheckConfig, raw: RawPassiveHealthCheck) {
    if let Some(ms) = raw.period_ms {
        target.period = Duration::from_millis(ms);
    }
    if let Some(v) = raw.min_requests {
        target.min_requests = v;
    }
    if let Some(v) = raw.failure_rate_threshold {
        target.failure_rate_threshold = v;
    }
    if let Some(v) = raw.scale {
        target.scale = v;
    }
    if let Some(v) = raw.min_drop_probability {
        target.min_drop_probability = v;
    }
    if let Some(v) = raw.max_drop_probability {
        target.max_drop_probability = v;
    }
}

fn apply_scheduler(target: &mut SchedulerDefaults, raw: RawScheduler) {
    if let Some(v) = raw.max_concurrency {
        target.max_concurrency = v;
    }
    if let Some(v) = raw.max_queue_size {
        target.max_queue_size = v;
    }
    if let Some(ms) = raw.timeout_ms {
        target.timeout = Duration::from_millis(ms);
    }
}

fn apply_cli(config: &mut Config, cli: &Cli) {
    if let Some(addr) = &cli.listen_addr {
        config.listen_addr = addr.clone();
    }
    if let Some(addr) = &cli.admin_listen_addr {
        config.admin_listen_addr = Some(addr.clone());
    }
    if let Some(n) = cli.threads_per_service {
        config.threads_per_service = n;
    }
    if let Some(n) = cli.max_loopbacks {
        config.max_loopbacks = n;
    }
}
