use std::collections::HashSet;
use std::env;
use std::str::FromStr;

use log::info;

use crate::statistics::MedianMode;

const DEFAULT_SCAN_DURATION_SECS: u64 = 10;
const DEFAULT_REPORT_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub scan_duration_secs: u64,
    pub report_interval_secs: u64,
    pub name_filter: String,
    /// Upper-cased addresses to summarize; empty means every peripheral
    pub watch_devices: HashSet<String>,
    pub median_mode: MedianMode,
}

impl AnalyzerConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let scan_duration_secs =
            parse_secs(&lookup, "SCAN_DURATION_SECS", DEFAULT_SCAN_DURATION_SECS)?;
        let report_interval_secs =
            parse_secs(&lookup, "REPORT_INTERVAL_SECS", DEFAULT_REPORT_INTERVAL_SECS)?;

        let name_filter = lookup("NAME_FILTER")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        let mut watch_devices = HashSet::new();
        if let Some(devices) = lookup("WATCH_DEVICES") {
            for address in devices.split(',') {
                let address = address.trim();
                if !address.is_empty() {
                    watch_devices.insert(address.to_uppercase());
                }
            }
        }

        let median_mode = match lookup("MEDIAN_MODE") {
            Some(mode) if !mode.trim().is_empty() => MedianMode::from_str(&mode)?,
            _ => MedianMode::default(),
        };

        info!(
            "Configuration: scan={}s, report={}s, filter='{}', watching {} device(s), median={}",
            scan_duration_secs,
            report_interval_secs,
            name_filter,
            watch_devices.len(),
            median_mode
        );

        Ok(AnalyzerConfig {
            scan_duration_secs,
            report_interval_secs,
            name_filter,
            watch_devices,
            median_mode,
        })
    }

    /// Whether a peripheral gets a periodic summary
    pub fn is_watched(&self, address: &str) -> bool {
        self.watch_devices.is_empty() || self.watch_devices.contains(&address.to_uppercase())
    }
}

fn parse_secs<F>(lookup: &F, key: &str, default: u64) -> Result<u64, Box<dyn std::error::Error>>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("{} must be a whole number of seconds: {}", key, e))?,
        None => default,
    };

    if value == 0 {
        return Err(format!("{} must be greater than zero", key).into());
    }

    Ok(value)
}
