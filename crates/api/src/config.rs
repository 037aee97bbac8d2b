use uptrack_core::hysteresis::Debounce;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Monitoring pipeline tuning.
    pub monitor: MonitorConfig,
    /// Ticketing collaborator endpoint; `None` disables ticket creation.
    pub ticketing_url: Option<String>,
}

/// Tuning parameters for the monitoring pipeline.
///
/// The debounce thresholds, suppression window, and escalation rule are
/// deliberate configuration, not constants: deployments tune them to their
/// probe cadence and ticketing capacity.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Hysteresis thresholds for the Up/Down state machine.
    pub debounce: Debounce,
    /// Trailing window for mass-outage suppression, in seconds.
    pub suppression_window_secs: i64,
    /// Incidents opened within the window at which further creation is
    /// suppressed.
    pub mass_outage_threshold: i64,
    /// Incidents for one entity in the trailing 24h at which severity is
    /// escalated one level.
    pub repeat_incident_escalation: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            debounce: Debounce::default(),
            suppression_window_secs: 120,
            mass_outage_threshold: 25,
            repeat_incident_escalation: 3,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                    |
    /// |--------------------------------|----------------------------|
    /// | `HOST`                         | `0.0.0.0`                  |
    /// | `PORT`                         | `3000`                     |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                       |
    /// | `DEBOUNCE_FAIL_THRESHOLD`      | `3`                        |
    /// | `DEBOUNCE_RECOVER_THRESHOLD`   | `2`                        |
    /// | `SUPPRESSION_WINDOW_SECS`      | `120`                      |
    /// | `MASS_OUTAGE_THRESHOLD`        | `25`                       |
    /// | `REPEAT_INCIDENT_ESCALATION`   | `3`                        |
    /// | `TICKETING_URL`                | unset (ticketing disabled) |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let monitor = MonitorConfig {
            debounce: Debounce {
                fail_threshold: env_u32("DEBOUNCE_FAIL_THRESHOLD", 3),
                recover_threshold: env_u32("DEBOUNCE_RECOVER_THRESHOLD", 2),
            },
            suppression_window_secs: env_i64("SUPPRESSION_WINDOW_SECS", 120),
            mass_outage_threshold: env_i64("MASS_OUTAGE_THRESHOLD", 25),
            repeat_incident_escalation: env_i64("REPEAT_INCIDENT_ESCALATION", 3),
        };

        let ticketing_url = std::env::var("TICKETING_URL").ok().filter(|s| !s.is_empty());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            monitor,
            ticketing_url,
        }
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .map(|v| v.parse().unwrap_or_else(|_| panic!("{name} must be a valid u32")))
        .unwrap_or(default)
}

fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .map(|v| v.parse().unwrap_or_else(|_| panic!("{name} must be a valid i64")))
        .unwrap_or(default)
}
