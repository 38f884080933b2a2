/// Bluetooth Low Energy scanning and advertisement formatting
use futures_util::StreamExt;
use log::{debug, error, warn};
use std::collections::{BTreeSet, HashMap};
use time::OffsetDateTime;
use tokio::time::{sleep, Duration};

use crate::config::AnalyzerConfig;
use crate::models::Observation;
use crate::utils::format_timestamp;

const NO_ADVERTISED_DATA: &str = "No advertised data";

/// Summarize manufacturer data and service UUIDs as one display string
///
/// Manufacturer entries are ordered by company identifier so the string is
/// stable between scan passes. Payload bytes are printed as hex pairs.
///
/// # Arguments
/// * `manufacturer_data` - Company identifier -> payload bytes from the advertisement
/// * `service_uuids` - Advertised service UUIDs, already stringified
///
/// # Returns
/// Formatted summary, or a placeholder when the advertisement carries neither
pub fn format_advertised_data(
    manufacturer_data: &HashMap<u16, Vec<u8>>,
    service_uuids: &BTreeSet<String>,
) -> String {
    let mut company_ids: Vec<&u16> = manufacturer_data.keys().collect();
    company_ids.sort();

    // One `0xIIII: AA BB ..` entry per company identifier
    let mut parts: Vec<String> = company_ids
        .into_iter()
        .map(|id| {
            let payload = manufacturer_data[id]
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ");
            if payload.is_empty() {
                format!("0x{:04X}", id)
            } else {
                format!("0x{:04X}: {}", id, payload)
            }
        })
        .collect();

    // Service UUIDs go last as a single entry
    if !service_uuids.is_empty() {
        parts.push(format!(
            "services: {}",
            service_uuids.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
    }

    if parts.is_empty() {
        NO_ADVERTISED_DATA.to_string()
    } else {
        parts.join("; ")
    }
}

/// Name search used for the peripheral list
///
/// An empty filter accepts everything; otherwise the name must contain the
/// filter case-insensitively and unnamed devices never match.
pub fn matches_name_filter(name: Option<&str>, filter: &str) -> bool {
    if filter.is_empty() {
        return true;
    }
    name.map(|n| n.to_lowercase().contains(&filter.to_lowercase()))
        .unwrap_or(false)
}

/// Run one discovery window and report every peripheral seen with an RSSI
///
/// This function performs a Bluetooth Low Energy scan for the configured
/// duration, then reads name, RSSI, manufacturer data and service UUIDs from
/// every device BlueZ knows about. All observations from one pass share the
/// timestamp taken when discovery stopped, which becomes the sample key in
/// each peripheral's history.
///
/// # Arguments
/// * `config` - Scan duration and name filter
///
/// # Returns
/// Result containing one Observation per peripheral heard during the pass,
/// or error if the adapter cannot be used
pub async fn scan_for_peripherals(
    config: &AnalyzerConfig,
) -> Result<Vec<Observation>, Box<dyn std::error::Error>> {
    let mut observations = Vec::new();

    // Initialize Bluetooth session
    let session = match bluer::Session::new().await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to create Bluetooth session: {}", e);
            return Err(e.into());
        }
    };

    // Get the default Bluetooth adapter
    let adapter = match session.default_adapter().await {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("Failed to get default Bluetooth adapter: {}", e);
            return Err(e.into());
        }
    };

    // Ensure Bluetooth adapter is powered on
    if let Err(e) = adapter.set_powered(true).await {
        error!("Failed to power on adapter: {}", e);
        return Err(e.into());
    }

    // Duplicate advertisements keep the RSSI property refreshing
    let filter = bluer::DiscoveryFilter {
        transport: bluer::DiscoveryTransport::Le,
        duplicate_data: true,
        ..Default::default()
    };

    // Apply the discovery filter (warn if it fails, but continue)
    if let Err(e) = adapter.set_discovery_filter(filter).await {
        warn!("Failed to set discovery filter: {}", e);
    }

    // Start device discovery in background
    let discovery_handle = match adapter.discover_devices().await {
        Ok(discovery_stream) => tokio::spawn(async move {
            let mut stream = discovery_stream;
            while let Some(event) = stream.next().await {
                debug!("Discovery event: {:?}", event);
            }
        }),
        Err(e) => {
            error!("Failed to start device discovery: {}", e);
            return Err(e.into());
        }
    };

    // Let discovery run for the configured duration, then stop it
    sleep(Duration::from_secs(config.scan_duration_secs)).await;
    discovery_handle.abort();

    // Shared sample key for everything seen in this pass
    let timestamp = format_timestamp(&OffsetDateTime::now_utc());

    // Get all discovered device addresses
    let devices = match adapter.device_addresses().await {
        Ok(devices) => devices,
        Err(e) => {
            error!("Failed to get device addresses: {}", e);
            return Err(e.into());
        }
    };

    // Process each discovered device
    for addr in devices {
        let device = match adapter.device(addr) {
            Ok(device) => device,
            Err(_) => continue,
        };

        let address = device.address().to_string().to_uppercase();

        // BlueZ clears RSSI for devices not heard during this discovery
        let rssi = match device.rssi().await {
            Ok(Some(rssi)) => rssi,
            Ok(None) => {
                debug!("No RSSI for {}, skipping", address);
                continue;
            }
            Err(e) => {
                debug!("Failed to get RSSI for {}: {}", address, e);
                continue;
            }
        };

        let name = device.name().await.unwrap_or_else(|e| {
            debug!("Failed to get name for {}: {}", address, e);
            None
        });

        // Only keep devices matching the search text
        if !matches_name_filter(name.as_deref(), &config.name_filter) {
            continue;
        }

        let manufacturer_data = match device.manufacturer_data().await {
            Ok(data) => data.unwrap_or_default(),
            Err(e) => {
                debug!("Failed to get manufacturer data for {}: {}", address, e);
                HashMap::new()
            }
        };

        let service_uuids: BTreeSet<String> = match device.uuids().await {
            Ok(uuids) => uuids
                .unwrap_or_default()
                .into_iter()
                .map(|u| u.to_string())
                .collect(),
            Err(e) => {
                debug!("Failed to get service UUIDs for {}: {}", address, e);
                BTreeSet::new()
            }
        };

        debug!(
            "Observed {} ({}) at {} dBm",
            address,
            name.as_deref().unwrap_or("Unknown Name"),
            rssi
        );

        observations.push(Observation {
            address,
            name,
            rssi,
            advertised_data: format_advertised_data(&manufacturer_data, &service_uuids),
            timestamp: timestamp.clone(),
        });
    }

    Ok(observations)
}
