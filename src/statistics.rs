/// Summary statistics over a peripheral's RSSI history
use std::fmt;
use std::str::FromStr;

use crate::models::{SampleHistory, SummaryRecord, TimeRange};

/// How the median of an even-sized history is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MedianMode {
    /// Average of the two central sorted values
    #[default]
    Conventional,
    /// Average of sorted positions `n/2 - 1` and `n/2 + 1`, as the legacy
    /// summary view computed it. Absent when `n/2 + 1` is out of bounds.
    ObservedIndexing,
}

impl FromStr for MedianMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conventional" => Ok(MedianMode::Conventional),
            "observed" | "observed-indexing" => Ok(MedianMode::ObservedIndexing),
            other => Err(format!("Unknown median mode: '{}'", other)),
        }
    }
}

impl fmt::Display for MedianMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MedianMode::Conventional => write!(f, "conventional"),
            MedianMode::ObservedIndexing => write!(f, "observed"),
        }
    }
}

/// Stateless summarizer; each call works on the snapshot it is handed
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsEngine {
    median_mode: MedianMode,
}

impl StatisticsEngine {
    pub fn new(median_mode: MedianMode) -> Self {
        StatisticsEngine { median_mode }
    }

    pub fn median_mode(&self) -> MedianMode {
        self.median_mode
    }

    /// Compute every summary field from scratch
    ///
    /// Aggregates over an empty history are `None` rather than a numeric
    /// placeholder, so a NaN from `0 / 0` can never reach a display.
    pub fn summarize(&self, history: &SampleHistory) -> SummaryRecord {
        let values: Vec<f64> = history.iter().map(|s| f64::from(s.rssi)).collect();

        let mean = mean(&values);
        let min = history.iter().map(|s| s.rssi).min();
        let max = history.iter().map(|s| s.rssi).max();

        let standard_deviation = mean.map(|m| {
            let squared: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
            (squared / values.len() as f64).sqrt()
        });

        let time_range = match (history.first(), history.last()) {
            (Some(first), Some(last)) => Some(TimeRange {
                start: first.timestamp.clone(),
                end: last.timestamp.clone(),
            }),
            _ => None,
        };

        SummaryRecord {
            mean,
            median: self.median(history),
            min,
            max,
            // i16 difference of two RSSI values can overflow only with
            // values outside any real radio range
            range: min.zip(max).and_then(|(lo, hi)| hi.checked_sub(lo)),
            standard_deviation,
            time_range,
            sample_count: history.len(),
        }
    }

    /// RSSI of the first sample whose timestamp equals `timestamp`
    ///
    /// Duplicate timestamps resolve to the earliest sample in insertion order.
    pub fn lookup_rssi(&self, history: &SampleHistory, timestamp: &str) -> Option<i16> {
        history
            .samples()
            .iter()
            .find(|s| s.timestamp == timestamp)
            .map(|s| s.rssi)
    }

    fn median(&self, history: &SampleHistory) -> Option<f64> {
        if history.is_empty() {
            return None;
        }

        let mut sorted: Vec<i16> = history.samples().iter().map(|s| s.rssi).collect();
        sorted.sort_unstable();

        let count = sorted.len();
        let middle = count / 2;
        if count % 2 == 1 {
            return Some(f64::from(sorted[middle]));
        }

        let (lower, upper) = match self.median_mode {
            MedianMode::Conventional => (middle - 1, middle),
            MedianMode::ObservedIndexing => (middle - 1, middle + 1),
        };

        let lower = sorted.get(lower)?;
        let upper = sorted.get(upper)?;
        Some((f64::from(*lower) + f64::from(*upper)) / 2.0)
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sample;

    fn history(points: &[(i16, &str)]) -> SampleHistory {
        points
            .iter()
            .map(|(rssi, ts)| Sample::new(*rssi, *ts))
            .collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn summarize_three_samples() {
        let engine = StatisticsEngine::default();
        let summary = engine.summarize(&history(&[(-50, "t1"), (-60, "t2"), (-70, "t3")]));

        assert_eq!(summary.mean, Some(-60.0));
        assert_eq!(summary.median, Some(-60.0));
        assert_eq!(summary.min, Some(-70));
        assert_eq!(summary.max, Some(-50));
        assert_eq!(summary.range, Some(20));
        assert_eq!(summary.sample_count, 3);
        assert_eq!(
            summary.time_range,
            Some(TimeRange {
                start: "t1".to_string(),
                end: "t3".to_string()
            })
        );

        let expected_sd = (200.0_f64 / 3.0).sqrt();
        assert!(approx(summary.standard_deviation.unwrap(), expected_sd));
        assert!((summary.standard_deviation.unwrap() - 8.16).abs() < 0.01);
    }

    #[test]
    fn empty_history_is_all_absent() {
        let engine = StatisticsEngine::default();
        let summary = engine.summarize(&SampleHistory::new());

        assert_eq!(summary.mean, None);
        assert_eq!(summary.median, None);
        assert_eq!(summary.min, None);
        assert_eq!(summary.max, None);
        assert_eq!(summary.range, None);
        assert_eq!(summary.standard_deviation, None);
        assert_eq!(summary.time_range, None);
        assert_eq!(summary.sample_count, 0);
    }

    #[test]
    fn even_median_conventional() {
        let engine = StatisticsEngine::new(MedianMode::Conventional);
        let h = history(&[(-80, "t1"), (-60, "t2"), (-40, "t3"), (-20, "t4")]);
        assert_eq!(engine.summarize(&h).median, Some(-50.0));
    }

    #[test]
    fn even_median_observed_indexing() {
        let engine = StatisticsEngine::new(MedianMode::ObservedIndexing);
        let h = history(&[(-80, "t1"), (-60, "t2"), (-40, "t3"), (-20, "t4")]);
        assert_eq!(engine.summarize(&h).median, Some(-40.0));
    }

    #[test]
    fn observed_indexing_two_samples_is_absent() {
        let engine = StatisticsEngine::new(MedianMode::ObservedIndexing);
        let summary = engine.summarize(&history(&[(-80, "t1"), (-60, "t2")]));
        assert_eq!(summary.median, None);
        assert_eq!(summary.mean, Some(-70.0));
    }

    #[test]
    fn median_sorts_before_picking() {
        let engine = StatisticsEngine::default();
        let h = history(&[(-40, "a"), (-90, "b"), (-55, "c"), (-70, "d"), (-41, "e")]);
        assert_eq!(engine.summarize(&h).median, Some(-55.0));
    }

    #[test]
    fn single_sample() {
        let engine = StatisticsEngine::default();
        let summary = engine.summarize(&history(&[(-42, "t1")]));

        assert_eq!(summary.mean, Some(-42.0));
        assert_eq!(summary.median, Some(-42.0));
        assert_eq!(summary.range, Some(0));
        assert_eq!(summary.standard_deviation, Some(0.0));
        assert_eq!(
            summary.time_range,
            Some(TimeRange {
                start: "t1".to_string(),
                end: "t1".to_string()
            })
        );
    }

    #[test]
    fn time_range_uses_insertion_order() {
        let engine = StatisticsEngine::default();
        let summary = engine.summarize(&history(&[(-50, "b"), (-51, "a"), (-52, "c"), (-53, "0")]));
        let range = summary.time_range.unwrap();
        assert_eq!(range.start, "b");
        assert_eq!(range.end, "0");
    }

    #[test]
    fn bounds_hold_for_assorted_histories() {
        let cases: Vec<Vec<i16>> = vec![
            vec![-100],
            vec![-30, -31],
            vec![-90, -10, -55, -55],
            vec![-1, -2, -3, -4, -5, -6, -7],
            vec![-110, 0, -60, -61, -62, -100, -20, -45],
        ];
        let engine = StatisticsEngine::default();

        for values in cases {
            let h: SampleHistory = values
                .iter()
                .enumerate()
                .map(|(i, v)| Sample::new(*v, format!("t{}", i)))
                .collect();
            let s = engine.summarize(&h);
            let (min, max) = (f64::from(s.min.unwrap()), f64::from(s.max.unwrap()));

            assert!(min <= s.mean.unwrap() && s.mean.unwrap() <= max, "{:?}", values);
            assert!(min <= s.median.unwrap() && s.median.unwrap() <= max, "{:?}", values);
            assert_eq!(s.range.unwrap(), s.max.unwrap() - s.min.unwrap());
            assert!(s.standard_deviation.unwrap() >= 0.0);
            assert_eq!(s.sample_count, values.len());
        }
    }

    #[test]
    fn standard_deviation_zero_only_for_identical_values() {
        let engine = StatisticsEngine::default();

        let flat = history(&[(-65, "t1"), (-65, "t2"), (-65, "t3")]);
        assert_eq!(engine.summarize(&flat).standard_deviation, Some(0.0));

        let varied = history(&[(-65, "t1"), (-65, "t2"), (-64, "t3")]);
        assert!(engine.summarize(&varied).standard_deviation.unwrap() > 0.0);
    }

    #[test]
    fn population_standard_deviation() {
        let engine = StatisticsEngine::default();
        let h = history(&[(-2, "a"), (-4, "b"), (-4, "c"), (-4, "d"), (-5, "e"), (-5, "f"), (-7, "g"), (-9, "h")]);
        assert!(approx(engine.summarize(&h).standard_deviation.unwrap(), 2.0));
    }

    #[test]
    fn lookup_rssi_finds_matching_timestamp() {
        let engine = StatisticsEngine::default();
        let h = history(&[(-42, "t1"), (-50, "t2")]);

        assert_eq!(engine.lookup_rssi(&h, "t1"), Some(-42));
        assert_eq!(engine.lookup_rssi(&h, "missing"), None);
        assert_eq!(engine.lookup_rssi(&SampleHistory::new(), "t1"), None);
    }

    #[test]
    fn lookup_rssi_first_match_wins() {
        let engine = StatisticsEngine::default();
        let h = history(&[(-70, "dup"), (-30, "t2"), (-20, "dup")]);
        assert_eq!(engine.lookup_rssi(&h, "dup"), Some(-70));
    }

    #[test]
    fn median_mode_parsing() {
        assert_eq!("conventional".parse::<MedianMode>(), Ok(MedianMode::Conventional));
        assert_eq!(" Observed ".parse::<MedianMode>(), Ok(MedianMode::ObservedIndexing));
        assert!("mean".parse::<MedianMode>().is_err());
        assert_eq!(MedianMode::ObservedIndexing.to_string(), "observed");
    }
}
