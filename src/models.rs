/// Data records shared by the scanner, the registry and the statistics engine

/// One RSSI measurement for a peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub rssi: i16,
    pub timestamp: String,
}

impl Sample {
    pub fn new(rssi: i16, timestamp: impl Into<String>) -> Self {
        Sample {
            rssi,
            timestamp: timestamp.into(),
        }
    }
}

/// Append-only, insertion-ordered log of samples for a single peripheral
///
/// Samples are never mutated or removed once pushed. Cloning a history is
/// how callers take a stable snapshot while scanning keeps appending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleHistory {
    samples: Vec<Sample>,
}

impl SampleHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }
}

impl FromIterator<Sample> for SampleHistory {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        SampleHistory {
            samples: iter.into_iter().collect(),
        }
    }
}

/// First and last sample timestamps of a history, in insertion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

/// Descriptive statistics derived from a `SampleHistory`
///
/// Every aggregate is `None` for an empty history; only `sample_count` is
/// always defined.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<i16>,
    pub max: Option<i16>,
    pub range: Option<i16>,
    pub standard_deviation: Option<f64>,
    pub time_range: Option<TimeRange>,
    pub sample_count: usize,
}

/// A single sighting of a peripheral during one scan pass
#[derive(Debug, Clone)]
pub struct Observation {
    pub address: String,
    pub name: Option<String>,
    pub rssi: i16,
    pub advertised_data: String,
    pub timestamp: String,
}

/// A peripheral's latest advertisement together with its RSSI history
#[derive(Debug, Clone)]
pub struct DiscoveredPeripheral {
    pub address: String,
    pub name: Option<String>,
    pub advertised_data: String,
    pub rssi: i16,
    pub timestamp: String,
    pub history: SampleHistory,
}

impl DiscoveredPeripheral {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown Name")
    }
}
