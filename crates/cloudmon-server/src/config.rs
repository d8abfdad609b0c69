use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_collect_interval_mins")]
    pub collect_interval_mins: u64,
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    #[serde(default = "default_resource_batch_count")]
    pub resource_batch_count: usize,
    /// Oracle throttles per-instance metric calls hard
    #[serde(default = "default_oracle_resource_batch_count")]
    pub oracle_resource_batch_count: usize,
    #[serde(default = "default_account_batch_count")]
    pub account_batch_count: usize,
    /// Provider tags never pulled, compared case-insensitively
    #[serde(default)]
    pub skip_metric_pull_providers: Vec<String>,
    #[serde(default = "default_influx_database")]
    pub influx_database: String,
    #[serde(default = "default_meter_database")]
    pub meter_database: String,
    #[serde(default)]
    pub tsdb_urls: Vec<String>,
    #[serde(default = "default_sink_batch_size")]
    pub sink_batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub sink_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub sdk_timeout_secs: u64,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

/// One cloud account to collect.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub provider: String,
    pub id: String,
    pub name: String,
    /// Base URL of the account's metric gateway
    pub sdk_endpoint: String,
    pub sdk_token: Option<String>,
    /// JSON snapshot of the account's resources
    pub resources_file: String,
}

fn default_collect_interval_mins() -> u64 {
    6
}

fn default_tick_secs() -> u64 {
    60
}

fn default_resource_batch_count() -> usize {
    10
}

fn default_oracle_resource_batch_count() -> usize {
    1
}

fn default_account_batch_count() -> usize {
    5
}

fn default_influx_database() -> String {
    "telegraf".to_string()
}

fn default_meter_database() -> String {
    "meter_db".to_string()
}

fn default_sink_batch_size() -> usize {
    5000
}

fn default_timeout_secs() -> u64 {
    30
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn collect_interval(&self) -> Duration {
        Duration::from_secs(self.collect_interval_mins * 60)
    }
}
