/// Discovered peripherals and their growing RSSI histories
use log::{debug, info};
use std::collections::HashMap;

use crate::bluetooth::scanner::matches_name_filter;
use crate::models::{DiscoveredPeripheral, Observation, Sample, SampleHistory};

/// Peripherals keyed by upper-cased address, kept in discovery order
#[derive(Debug, Default)]
pub struct PeripheralRegistry {
    peripherals: Vec<DiscoveredPeripheral>,
    index: HashMap<String, usize>,
}

impl PeripheralRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one sighting, appending its RSSI to the peripheral's history
    pub fn record(&mut self, observation: Observation) {
        let address = observation.address.to_uppercase();
        let sample = Sample::new(observation.rssi, observation.timestamp.clone());

        match self.index.get(&address) {
            Some(&i) => {
                let peripheral = &mut self.peripherals[i];
                if observation.name.is_some() {
                    peripheral.name = observation.name;
                }
                peripheral.advertised_data = observation.advertised_data;
                peripheral.rssi = observation.rssi;
                peripheral.timestamp = observation.timestamp;
                peripheral.history.push(sample);
            }
            None => {
                info!(
                    "Discovered {} ({})",
                    address,
                    observation.name.as_deref().unwrap_or("Unknown Name")
                );
                let mut history = SampleHistory::new();
                history.push(sample);
                self.index.insert(address.clone(), self.peripherals.len());
                self.peripherals.push(DiscoveredPeripheral {
                    address,
                    name: observation.name,
                    advertised_data: observation.advertised_data,
                    rssi: observation.rssi,
                    timestamp: observation.timestamp,
                    history,
                });
            }
        }
    }

    pub fn get(&self, address: &str) -> Option<&DiscoveredPeripheral> {
        self.index
            .get(&address.to_uppercase())
            .map(|&i| &self.peripherals[i])
    }

    pub fn len(&self) -> usize {
        self.peripherals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peripherals.is_empty()
    }

    /// Peripherals whose name matches the search text
    pub fn filtered<'a>(
        &'a self,
        name_filter: &'a str,
    ) -> impl Iterator<Item = &'a DiscoveredPeripheral> + 'a {
        self.peripherals
            .iter()
            .filter(move |p| matches_name_filter(p.name.as_deref(), name_filter))
    }

    /// Copy of a peripheral's history, detached from further appends
    pub fn history_snapshot(&self, address: &str) -> Option<SampleHistory> {
        self.get(address).map(|p| p.history.clone())
    }

    /// Drop a peripheral together with its history
    pub fn remove(&mut self, address: &str) -> Option<DiscoveredPeripheral> {
        let i = self.index.remove(&address.to_uppercase())?;
        let removed = self.peripherals.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        debug!(
            "Discarded {} with {} samples",
            removed.address,
            removed.history.len()
        );
        Some(removed)
    }
}
