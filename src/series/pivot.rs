//! Row-to-series pivot
//!
//! Groups decoded metrics into one series per distinct label tuple, all
//! aligned to a shared time axis.
//!
//! # Ordering
//!
//! - The time axis keeps the order timestamps are first seen in the rows.
//! - Series are ordered by the first row that carried their label tuple.
//!
//! A (series, timestamp) slot with no row stays `None`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::series::extract::Metric;
use crate::series::legend::{default_series_name, LegendFormatter};

/// Assigns keys to label tuples in first-seen order
///
/// Each trie level is one label position. Every call within one pivot must
/// pass the same label names in the same order.
#[derive(Debug, Default)]
pub struct SeriesMapper {
    label_names: Option<Vec<String>>,
    root: MapperNode,
    next_key: usize,
}

#[derive(Debug, Default)]
struct MapperNode {
    children: HashMap<String, MapperNode>,
    key: Option<usize>,
}

impl SeriesMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key of `labels`, and whether it was assigned by this call
    ///
    /// # Panics
    /// Panics if the label names differ from the first call's.
    pub fn key(&mut self, labels: &[(String, String)]) -> (usize, bool) {
        if self.label_names.is_none() {
            self.label_names = Some(labels.iter().map(|(l, _)| l.clone()).collect());
        }
        if let Some(names) = &self.label_names {
            assert!(
                names.len() == labels.len() && names.iter().zip(labels).all(|(n, (l, _))| n == l),
                "SeriesMapper: label names {:?} differ from {:?}",
                labels.iter().map(|(l, _)| l).collect::<Vec<_>>(),
                names
            );
        }

        let mut node = &mut self.root;
        for (_, value) in labels {
            node = node.children.entry(value.clone()).or_default();
        }

        match node.key {
            Some(key) => (key, false),
            None => {
                let key = self.next_key;
                self.next_key += 1;
                node.key = Some(key);
                (key, true)
            }
        }
    }

    /// Number of distinct label tuples seen
    pub fn len(&self) -> usize {
        self.next_key
    }

    pub fn is_empty(&self) -> bool {
        self.next_key == 0
    }
}

/// One pivoted series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub name: String,
    pub sort_key: usize,
    /// One slot per time-axis position
    pub values: Vec<Option<f64>>,
    pub labels: Vec<(String, String)>,
}

/// Series sharing one time axis
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeriesFrame {
    pub timestamps: Vec<DateTime<Utc>>,
    pub series: Vec<MetricSeries>,
}

impl TimeSeriesFrame {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Pivot `metrics` into series
///
/// `legend` names each series; when it renders empty the name falls back to
/// the labels, or to `metric_name` for unlabeled series.
pub fn pivot(metrics: &[Metric], legend: &str, metric_name: &str) -> TimeSeriesFrame {
    let mut timestamps = Vec::new();
    let mut positions: HashMap<DateTime<Utc>, usize> = HashMap::new();
    for metric in metrics {
        positions.entry(metric.timestamp).or_insert_with(|| {
            timestamps.push(metric.timestamp);
            timestamps.len() - 1
        });
    }

    let mut mapper = SeriesMapper::new();
    let legend = LegendFormatter::new(legend);
    let mut series: HashMap<usize, MetricSeries> = HashMap::new();

    for metric in metrics {
        let (key, _) = mapper.key(&metric.labels);
        let entry = series.entry(key).or_insert_with(|| {
            let name = match legend.format(&metric.labels) {
                name if name.is_empty() => default_series_name(metric_name, &metric.labels),
                name => name,
            };
            MetricSeries {
                name,
                sort_key: key,
                values: vec![None; timestamps.len()],
                labels: metric.labels.clone(),
            }
        });
        if let Some(&position) = positions.get(&metric.timestamp) {
            entry.values[position] = metric.value;
        }
    }

    let mut series: Vec<MetricSeries> = series.into_values().collect();
    series.sort_by_key(|s| s.sort_key);

    tracing::debug!(
        series = series.len(),
        timestamps = timestamps.len(),
        rows = metrics.len(),
        "Pivoted result"
    );

    TimeSeriesFrame { timestamps, series }
}
