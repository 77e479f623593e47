//! Configuration file management.
//!
//! Reads/writes `~/.beacon-telemetry/config.yaml` with dashboard address,
//! sweep interval, log level, webhook URL, and ingest auth token.

use std::path::{Path, PathBuf};

use crate::types::Result;

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub dashboard: DashboardConfig,
    pub registry: RegistryConfig,
    pub log: LogConfig,
    pub webhook: Option<String>,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    /// Seconds between expiry sweeps.
    pub sweep_interval_secs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `info` or `telemetry_core=debug`.
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dashboard: DashboardConfig {
                host: "127.0.0.1".into(),
                port: 8073,
            },
            registry: RegistryConfig {
                sweep_interval_secs: 30.0,
            },
            log: LogConfig {
                level: "info".into(),
            },
            webhook: None,
            auth_token: None,
        }
    }
}

/// Get the config directory path (`~/.beacon-telemetry/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".beacon-telemetry")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.beacon-telemetry/config.yaml`.
///
/// Returns default config if the file doesn't exist or can't be read.
pub fn load_config() -> Config {
    load_config_from(&config_file())
}

pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_config(&text),
        Err(_) => Config::default(),
    }
}

/// Save config to `~/.beacon-telemetry/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf> {
    let path = config_file();
    save_config_to(config, &path)?;
    Ok(path)
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, serialize_config(config))?;
    Ok(())
}

/// Parse simple YAML-like config text. Unknown keys are ignored.
fn parse_config(text: &str) -> Config {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            if val.is_empty() {
                current_section = Some(key.to_string());
                continue;
            }
            current_section = None;
            match key {
                "webhook" => config.webhook = parse_string_value(val),
                "auth_token" => config.auth_token = parse_string_value(val),
                _ => {}
            }
            continue;
        }

        match (current_section.as_deref(), key) {
            (Some("dashboard"), "host") => {
                if let Some(v) = parse_string_value(val) {
                    config.dashboard.host = v;
                }
            }
            (Some("dashboard"), "port") => {
                if let Ok(v) = val.parse::<u16>() {
                    config.dashboard.port = v;
                }
            }
            (Some("registry"), "sweep_interval_secs") => {
                if let Some(v) = parse_float_value(val).filter(|v| *v > 0.0) {
                    config.registry.sweep_interval_secs = v;
                }
            }
            (Some("log"), "level") => {
                if let Some(v) = parse_string_value(val) {
                    config.log.level = v;
                }
            }
            _ => {}
        }
    }

    config
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_float_value(val: &str) -> Option<f64> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    val.parse().ok()
}

/// Serialize config to YAML-like text.
fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# beacon-telemetry configuration".to_string(), String::new()];

    lines.push("dashboard:".into());
    lines.push(format!("  host: \"{}\"", config.dashboard.host));
    lines.push(format!("  port: {}", config.dashboard.port));
    lines.push(String::new());

    lines.push("registry:".into());
    lines.push(format!(
        "  sweep_interval_secs: {}",
        config.registry.sweep_interval_secs
    ));
    lines.push(String::new());

    lines.push("log:".into());
    lines.push(format!("  level: \"{}\"", config.log.level));
    lines.push(String::new());

    for (key, value) in [("webhook", &config.webhook), ("auth_token", &config.auth_token)] {
        match value {
            Some(v) => lines.push(format!("{key}: \"{v}\"")),
            None => lines.push(format!("{key}: null")),
        }
    }

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
