mod bluetooth;
mod config;
mod models;
mod statistics;
mod utils;

use log::{error, info, warn};
use std::io::BufRead;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{mpsc, Mutex};

use bluetooth::{scan_for_peripherals, PeripheralRegistry};
use config::AnalyzerConfig;
use statistics::StatisticsEngine;
use utils::{duration_to_seconds, format_datetime, selection_line, summary_lines};

type SharedRegistry = Arc<Mutex<PeripheralRegistry>>;

/// A line typed on stdin while the service runs
#[derive(Debug, PartialEq, Eq)]
enum Command {
    /// Resolve a chart selection: `<ADDRESS> <timestamp>`
    Select { address: String, timestamp: String },
    /// Tear down a peripheral's detail history: `forget <ADDRESS>`
    Forget { address: String },
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let first = parts.next()?;
    let second = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    if first.eq_ignore_ascii_case("forget") {
        Some(Command::Forget {
            address: second.to_uppercase(),
        })
    } else {
        Some(Command::Select {
            address: first.to_uppercase(),
            timestamp: second.to_string(),
        })
    }
}

async fn report(registry: &SharedRegistry, config: &AnalyzerConfig, engine: &StatisticsEngine) {
    // Snapshot under the lock, summarize outside it
    let snapshots: Vec<(String, String, models::SampleHistory)> = {
        let registry = registry.lock().await;

        if registry.is_empty() {
            warn!("No peripherals discovered yet");
            return;
        }

        info!("Peripherals ({} discovered):", registry.len());
        for peripheral in registry.filtered(&config.name_filter) {
            info!(
                "  {} {} | {} dBm @ {} | {}",
                peripheral.address,
                peripheral.display_name(),
                peripheral.rssi,
                peripheral.timestamp,
                peripheral.advertised_data
            );
        }

        registry
            .filtered(&config.name_filter)
            .filter(|p| config.is_watched(&p.address))
            .map(|p| {
                (
                    p.address.clone(),
                    p.display_name().to_string(),
                    p.history.clone(),
                )
            })
            .collect()
    };

    if snapshots.is_empty() {
        warn!("No watched peripherals seen yet");
    }

    for (address, name, history) in snapshots {
        let summary = engine.summarize(&history);
        info!("Data summary for {} ({}):", name, address);
        for line in summary_lines(&summary) {
            info!("  {}", line);
        }
    }
}

async fn scan_loop(
    config: AnalyzerConfig,
    registry: SharedRegistry,
    engine: StatisticsEngine,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting BLE RSSI analyzer");

    loop {
        let start_time = OffsetDateTime::now_utc();
        info!("Starting report interval at: {}", format_datetime(&start_time));

        loop {
            let elapsed = duration_to_seconds(OffsetDateTime::now_utc() - start_time);
            if elapsed >= config.report_interval_secs {
                break;
            }

            let observations = match scan_for_peripherals(&config).await {
                Ok(observations) => observations,
                Err(e) => {
                    error!("Scan failed: {}", e);
                    // Avoid spinning when the adapter is unavailable
                    tokio::time::sleep(tokio::time::Duration::from_secs(config.scan_duration_secs))
                        .await;
                    continue;
                }
            };

            let mut guard = registry.lock().await;
            for observation in observations {
                guard.record(observation);
            }
        }

        report(&registry, &config, &engine).await;
    }
}

/// Forward lines from a blocking reader over a channel
///
/// The reader runs on its own OS thread rather than tokio's blocking pool,
/// so a read parked on an idle terminal never holds up runtime shutdown.
/// The channel closes when the reader hits EOF or an error.
fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);

    std::thread::spawn(move || {
        for line in reader.lines() {
            match line {
                Ok(line) => {
                    // Receiver gone means the service is shutting down
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to read selection: {}", e);
                    break;
                }
            }
        }
    });

    rx
}

async fn selection_loop(
    mut lines: mpsc::Receiver<String>,
    registry: SharedRegistry,
    engine: StatisticsEngine,
) {
    loop {
        let line = match lines.recv().await {
            Some(line) => line,
            None => {
                info!("Standard input closed, selection disabled");
                return;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Some(Command::Select { address, timestamp }) => {
                let snapshot = registry.lock().await.history_snapshot(&address);
                match snapshot {
                    Some(history) => {
                        let rssi = engine.lookup_rssi(&history, &timestamp);
                        info!("{}: {}", address, selection_line(&timestamp, rssi));
                    }
                    None => warn!("Unknown peripheral: {}", address),
                }
            }
            Some(Command::Forget { address }) => match registry.lock().await.remove(&address) {
                Some(_) => info!("Discarded history for {}", address),
                None => warn!("Unknown peripheral: {}", address),
            },
            None => warn!(
                "Unrecognized input '{}'; expected '<ADDRESS> <timestamp>' or 'forget <ADDRESS>'",
                line.trim()
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    let config = match AnalyzerConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    let engine = StatisticsEngine::new(config.median_mode);
    info!("Even-count medians use the {} method", engine.median_mode());
    let registry: SharedRegistry = Arc::new(Mutex::new(PeripheralRegistry::new()));

    let lines = spawn_line_reader(std::io::BufReader::new(std::io::stdin()));
    tokio::spawn(selection_loop(lines, registry.clone(), engine));

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(());
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    tokio::select! {
        result = scan_loop(config, registry, engine) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
