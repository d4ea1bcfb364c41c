// Rolling history of published frames
use crate::models::{time_label, Frame, MetricKind, RateSample, TargetId};
use chrono::{DateTime, Local};
use parking_lot::RwLock;
use std::collections::VecDeque;

/// Fixed-capacity FIFO; pushing onto a full buffer evicts the oldest item
#[derive(Debug, Clone, PartialEq)]
pub struct RollingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingBuffer<T> {
    /// A zero capacity is treated as 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        while self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Drops from the oldest end when shrinking
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.iter().cloned().collect()
    }
}

#[derive(Debug, Clone)]
struct TargetSeries {
    target: TargetId,
    samples: RollingBuffer<RateSample>,
}

#[derive(Debug, Clone)]
struct HistoryInner {
    timestamps: RollingBuffer<DateTime<Local>>,
    series: Vec<TargetSeries>,
}

impl HistoryInner {
    fn new(capacity: usize) -> Self {
        Self {
            timestamps: RollingBuffer::new(capacity),
            series: Vec::new(),
        }
    }

    /// Empty series back-filled with idle samples to stay aligned with timestamps
    fn aligned_series(&self, target: &str) -> TargetSeries {
        let mut samples = RollingBuffer::new(self.timestamps.capacity());
        for _ in 0..self.timestamps.len() {
            samples.push(RateSample::idle());
        }
        TargetSeries {
            target: target.to_string(),
            samples,
        }
    }
}

/// Per-target rolling history sharing one timeline.
///
/// Every series always has exactly as many samples as there are timestamps.
/// Writers and readers take the same lock, so `snapshot` never observes a
/// partially appended frame.
#[derive(Debug)]
pub struct HistoryStore {
    inner: RwLock<HistoryInner>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(HistoryInner::new(capacity)),
        }
    }

    /// Record one frame. Targets missing from the frame get an idle sample.
    pub fn append(&self, frame: &Frame) {
        let mut inner = self.inner.write();

        for entry in &frame.samples {
            if !inner.series.iter().any(|s| s.target == entry.target) {
                let series = inner.aligned_series(&entry.target);
                inner.series.push(series);
            }
        }

        inner.timestamps.push(frame.timestamp);
        for series in inner.series.iter_mut() {
            let sample = frame
                .get(&series.target)
                .cloned()
                .unwrap_or_else(RateSample::idle);
            series.samples.push(sample);
        }
    }

    /// Consistent copy as of the last completed `append`
    pub fn snapshot(&self) -> HistorySnapshot {
        let inner = self.inner.read();
        HistorySnapshot {
            timestamps: inner.timestamps.to_vec(),
            targets: inner
                .series
                .iter()
                .map(|s| TargetHistory {
                    target: s.target.clone(),
                    samples: s.samples.to_vec(),
                })
                .collect(),
        }
    }

    pub fn set_capacity(&self, capacity: usize) {
        let mut inner = self.inner.write();
        inner.timestamps.set_capacity(capacity);
        for series in inner.series.iter_mut() {
            series.samples.set_capacity(capacity);
        }
    }

    /// Clear everything and start empty series for `targets`
    pub fn reset(&self, targets: &[TargetId]) {
        let mut inner = self.inner.write();
        inner.timestamps.clear();
        inner.series.clear();
        for target in targets {
            let series = inner.aligned_series(target);
            inner.series.push(series);
        }
    }

    /// Start tracking a target mid-run; no-op if already tracked
    pub fn add_target(&self, target: &str) {
        let mut inner = self.inner.write();
        if inner.series.iter().any(|s| s.target == target) {
            return;
        }
        let series = inner.aligned_series(target);
        inner.series.push(series);
    }

    /// Discard a target's history immediately
    pub fn remove_target(&self, target: &str) {
        self.inner.write().series.retain(|s| s.target != target);
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().timestamps.capacity()
    }

    /// Number of retained ticks
    pub fn len(&self) -> usize {
        self.inner.read().timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetHistory {
    pub target: TargetId,
    /// Aligned with `HistorySnapshot::timestamps`
    pub samples: Vec<RateSample>,
}

/// Immutable copy of the history, oldest tick first
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistorySnapshot {
    pub timestamps: Vec<DateTime<Local>>,
    /// In target registration order
    pub targets: Vec<TargetHistory>,
}

impl HistorySnapshot {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn target_names(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.target.as_str()).collect()
    }

    pub fn target(&self, name: &str) -> Option<&TargetHistory> {
        self.targets.iter().find(|t| t.target == name)
    }

    /// One metric of one target over time, for charting
    pub fn series(&self, name: &str, kind: MetricKind) -> Option<Vec<f64>> {
        self.target(name)
            .map(|t| t.samples.iter().map(|s| s.value(kind)).collect())
    }

    pub fn time_labels(&self) -> Vec<String> {
        self.timestamps.iter().map(time_label).collect()
    }

    /// Samples of every target at tick `index`
    pub fn tick(&self, index: usize) -> Option<(DateTime<Local>, Vec<(&str, &RateSample)>)> {
        let timestamp = *self.timestamps.get(index)?;
        let samples = self
            .targets
            .iter()
            .filter_map(|t| t.samples.get(index).map(|s| (t.target.as_str(), s)))
            .collect();
        Some((timestamp, samples))
    }
}
