//! splitgrid.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_EXECUTORS: u32 = 1;
const DEFAULT_MEMORY_BUDGET: u64 = 1024 * 1024 * 1024;
const DEFAULT_LOG_FILTER: &str = "splitgrid=info";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSection {
    /// Executors registered at construction, with ids `0..executors`.
    #[serde(default = "default_executors")]
    pub executors: u32,
    /// Per-executor memory budget used to compute headroom.
    #[serde(default = "default_memory_budget", with = "byte_size")]
    pub executor_memory_budget: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            executors: DEFAULT_EXECUTORS,
            executor_memory_budget: DEFAULT_MEMORY_BUDGET,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_executors() -> u32 {
    DEFAULT_EXECUTORS
}

fn default_memory_budget() -> u64 {
    DEFAULT_MEMORY_BUDGET
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl SchedulerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: SchedulerConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Config for `executors` executors with the default memory budget.
    pub fn with_executors(executors: u32) -> Self {
        SchedulerConfig {
            scheduler: SchedulerSection {
                executors,
                ..SchedulerSection::default()
            },
            logging: LoggingConfig::default(),
        }
    }
}

/// Parse a human-readable byte size such as `"512MiB"`, `"2 GB"` or `"4096"`.
pub fn parse_byte_size(input: &str) -> Option<u64> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    let value: u64 = digits.parse().ok()?;
    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "kb" => 1_000,
        "mb" => 1_000_000,
        "gb" => 1_000_000_000,
        "kib" | "k" => 1 << 10,
        "mib" | "m" => 1 << 20,
        "gib" | "g" => 1 << 30,
        _ => return None,
    };
    value.checked_mul(multiplier)
}

/// Serde adapter accepting either an integer byte count or a size string.
mod byte_size {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bytes(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Bytes(n) => Ok(n),
            Raw::Text(s) => super::parse_byte_size(&s)
                .ok_or_else(|| D::Error::custom(format!("invalid byte size: {s:?}"))),
        }
    }
}
