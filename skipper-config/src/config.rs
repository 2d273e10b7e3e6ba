//! The internal configuration structure.
//!
//! Mirrors the split the teacher proxy draws between an external,
//! serde/CLI-facing shape and the internal `Config` actually threaded through
//! bootstrap (see `motya_config::internal`): this is the internal shape,
//! built by [`crate::loader`] from a TOML file overlaid with CLI flags.

use std::time::Duration;

/// Process-wide configuration, covering every knob spec.md §6 names.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// How often each `DataClient` is polled for updates.
    pub source_poll_timeout: Duration,
    /// Upper bound on `<loopback>` re-entries per request.
    pub max_loopbacks: u32,
    /// Status code synthesized when no route matches, or when a shunt route
    /// has no status-setting filter.
    pub default_http_status: u16,
    /// Whether `Path`-style predicates ignore a trailing slash.
    pub ignore_trailing_slash: bool,

    /// Max idle backend connections kept per host by the upstream client.
    pub idle_connections_per_host: usize,
    /// How often idle backend connections are swept closed.
    pub close_idle_conns_period: Duration,

    /// Overall backend request timeout.
    pub timeout_backend: Duration,
    /// Time allowed for the backend's response headers to arrive.
    pub response_header_timeout_backend: Duration,
    /// Time allowed between sending an `Expect: 100-continue` and getting a
    /// response to proceed.
    pub expect_continue_timeout_backend: Duration,
    /// TCP keep-alive interval for backend connections.
    pub keep_alive_backend: Duration,
    /// TLS handshake timeout for backend connections.
    pub tls_handshake_timeout_backend: Duration,
    /// Flush interval used for streaming/upgraded backend responses; `None`
    /// disables periodic flushing (full buffering is left to the transport).
    pub backend_flush_interval: Option<Duration>,

    /// Enables the HTTP upgrade (Connection: Upgrade) byte-pipe path.
    pub experimental_upgrade: bool,

    /// Enables the passive health checker (§4.9).
    pub enable_passive_health_check: bool,
    pub passive_health_check: PassiveHealthCheckConfig,

    /// Scheduler (admission) defaults applied to routes that don't override them.
    pub scheduler_defaults: SchedulerDefaults,

    /// Address the proxy listens on for client traffic.
    pub listen_addr: String,
    /// Address the admin/observability surface listens on, if any.
    pub admin_listen_addr: Option<String>,

    pub threads_per_service: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_poll_timeout: Duration::from_millis(30),
            max_loopbacks: 9,
            default_http_status: 404,
            ignore_trailing_slash: false,
            idle_connections_per_host: 64,
            close_idle_conns_period: Duration::from_secs(20),
            timeout_backend: Duration::from_secs(60),
            response_header_timeout_backend: Duration::from_secs(60),
            expect_continue_timeout_backend: Duration::from_secs(30),
            keep_alive_backend: Duration::from_secs(30),
            tls_handshake_timeout_backend: Duration::from_secs(60),
            backend_flush_interval: None,
            experimental_upgrade: false,
            enable_passive_health_check: false,
            passive_health_check: PassiveHealthCheckConfig::default(),
            scheduler_defaults: SchedulerDefaults::default(),
            listen_addr: "0.0.0.0:9090".to_string(),
            admin_listen_addr: Some("127.0.0.1:9911".to_string()),
            threads_per_service: 8,
        }
    }
}

impl Config {
    /// Ad-hoc invariant checks, run once at startup. Mirrors
    /// `motya_config::internal::Config::validate`: failures are fatal,
    /// because an unvalidated config must never reach the routing engine.
    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        if self.max_loopbacks > 1000 {
            return Err(crate::error::ConfigError::Invalid(
                "max_loopbacks is unreasonably large".into(),
            ));
        }
        if !(100..=599).contains(&(self.default_http_status as i32)) {
            return Err(crate::error::ConfigError::Invalid(
                "default_http_status must be a valid HTTP status code".into(),
            ));
        }
        self.passive_health_check.validate()?;
        self.scheduler_defaults.validate()?;
        Ok(())
    }
}

/// Tuning for the passive health checker (§4.9):
/// `p = clamp((failure_rate - threshold) * scale, p_min, p_max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassiveHealthCheckConfig {
    pub period: Duration,
    pub min_requests: u32,
    pub failure_rate_threshold: f64,
    pub scale: f64,
    pub min_drop_probability: f64,
    pub max_drop_probability: f64,
}

impl Default for PassiveHealthCheckConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(10),
            min_requests: 10,
            failure_rate_threshold: 0.1,
            scale: 2.0,
            min_drop_probability: 0.0,
            max_drop_probability: 0.95,
        }
    }
}

impl PassiveHealthCheckConfig {
    fn validate(&self) -> Result<(), crate::error::ConfigError> {
        if self.min_drop_probability > self.max_drop_probability {
            return Err(crate::error::ConfigError::Invalid(
                "passive_health_check.min_drop_probability must be <= max_drop_probability".into(),
            ));
        }
        Ok(())
    }
}

/// Defaults for per-route scheduler queues (§4.6); a route's own filter
/// arguments override these per-field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerDefaults {
    pub max_concurrency: usize,
    pub max_queue_size: usize,
    pub timeout: Duration,
}

impl Default for SchedulerDefaults {
    fn default() -> Self {
        Self {
            max_concurrency: 100,
            max_queue_size: 100,
            timeout: Duration::from_secs(10),
        }
    }
}

impl SchedulerDefaults {
    /// The scheduler refuses a timeout below this: see spec.md §6
    /// ("minimum-timeout=1 ms").
    pub const MIN_TIMEOUT: Duration = Duration::from_millis(1);

    fn validate(&self) -> Result<(), crate::error::ConfigError> {
        if self.timeout < Self::MIN_TIMEOUT {
            return Err(crate::error::ConfigError::Invalid(format!(
                "scheduler timeout must be >= {:?}",
                Self::MIN_TIMEOUT
            )));
        }
        Ok(())
    }
}
