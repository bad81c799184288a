use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub probe: ProbeSettings,
    #[serde(default)]
    pub dispatch: DispatchSettings,
    #[serde(default)]
    pub proxy: ProxyFileConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between cycle triggers.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Run the first cycle immediately instead of waiting one interval.
    #[serde(default = "default_true")]
    pub run_on_start: bool,
    /// Optional random delay applied before each cycle, in seconds.
    #[serde(default)]
    pub jitter_min_secs: u64,
    #[serde(default)]
    pub jitter_max_secs: u64,
    /// Hard cap on one cycle's probe-and-dispatch phase. The cursor still
    /// advances when the cap elapses, so a wedged network call cannot stall
    /// rotation.
    #[serde(default = "default_cycle_cap_secs")]
    pub cycle_cap_secs: u64,
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_cycle_cap_secs() -> u64 {
    3300
}

fn default_true() -> bool {
    true
}

impl ScheduleConfig {
    pub fn new() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            run_on_start: true,
            jitter_min_secs: 0,
            jitter_max_secs: 0,
            cycle_cap_secs: default_cycle_cap_secs(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// Peer identifier of the reputation oracle on the messaging network.
    #[serde(default = "default_oracle")]
    pub oracle: String,
    #[serde(default = "default_probe_command")]
    pub probe_command: String,
    #[serde(default = "default_probe_retries")]
    pub max_retries: u32,
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_restriction_keywords")]
    pub restriction_keywords: Vec<String>,
}

fn default_oracle() -> String {
    "ReputationBot".to_string()
}

fn default_probe_command() -> String {
    crate::constants::PROBE_COMMAND.to_string()
}

fn default_probe_retries() -> u32 {
    crate::constants::PROBE_MAX_RETRIES
}

fn default_settle_secs() -> u64 {
    crate::constants::PROBE_SETTLE_SECS
}

fn default_retry_delay_secs() -> u64 {
    crate::constants::PROBE_RETRY_DELAY_SECS
}

fn default_restriction_keywords() -> Vec<String> {
    crate::constants::RESTRICTION_KEYWORDS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl ProbeSettings {
    pub fn new() -> Self {
        Self {
            oracle: default_oracle(),
            probe_command: default_probe_command(),
            max_retries: default_probe_retries(),
            settle_secs: default_settle_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            restriction_keywords: default_restriction_keywords(),
        }
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSelection {
    RoundRobin,
    Random,
}

/// Delay between consecutive sends. Zero pacing is rejected by validation;
/// bursts are exactly what gets a sender flagged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PacingConfig {
    /// Spread the batch evenly across a window: delay = window / batch.
    Fixed { window_secs: u64 },
    /// Uniform random delay in `min_secs..=max_secs` before each send.
    Jitter { min_secs: u64, max_secs: u64 },
}

impl Default for PacingConfig {
    fn default() -> Self {
        PacingConfig::Fixed { window_secs: 3600 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default = "default_template_selection")]
    pub template_selection: TemplateSelection,
}

fn default_batch_size() -> usize {
    50
}

fn default_template_selection() -> TemplateSelection {
    TemplateSelection::RoundRobin
}

impl DispatchSettings {
    pub fn new() -> Self {
        Self {
            batch_size: default_batch_size(),
            pacing: PacingConfig::default(),
            template_selection: default_template_selection(),
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyFileConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Proxy list file, one `host:port[:username:password]` per line.
    /// Relative paths resolve against the data directory.
    #[serde(default = "default_proxy_file")]
    pub path: String,
}

fn default_proxy_file() -> String {
    "proxies.txt".to_string()
}

impl ProxyFileConfig {
    pub fn new() -> Self {
        Self {
            enabled: false,
            path: default_proxy_file(),
        }
    }
}

impl Default for ProxyFileConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Base URL of the local protocol gateway the transport speaks to.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:8954".to_string()
}

impl TransportConfig {
    pub fn new() -> Self {
        Self {
            gateway_url: default_gateway_url(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_port() -> u16 {
    8787
}

impl ServerConfig {
    pub fn new() -> Self {
        Self {
            enabled: true,
            port: default_server_port(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            schedule: ScheduleConfig::default(),
            probe: ProbeSettings::default(),
            dispatch: DispatchSettings::default(),
            proxy: ProxyFileConfig::default(),
            transport: TransportConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}
