// JSON export: one object per tick, targets keyed in registration order
use crate::error::ExportError;
use crate::models::{time_label, RateSample};
use crate::monitor::HistorySnapshot;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

#[derive(Serialize)]
struct TickRecord<'a> {
    time: String,
    targets: TickTargets<'a>,
}

/// Ordered map of target name to metrics
struct TickTargets<'a>(Vec<(&'a str, &'a RateSample)>);

impl Serialize for TickTargets<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, sample) in &self.0 {
            map.serialize_entry(name, &TargetRecord::from(*sample))?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct TargetRecord<'a> {
    cpu: f64,
    memory: f64,
    network: f64,
    disk: f64,
    gpu: f64,
    pid: Option<u32>,
    username: &'a str,
}

impl<'a> From<&'a RateSample> for TargetRecord<'a> {
    fn from(sample: &'a RateSample) -> Self {
        Self {
            cpu: sample.cpu,
            memory: sample.memory,
            network: sample.network,
            disk: sample.disk,
            gpu: sample.gpu,
            pid: sample.pid,
            username: &sample.username,
        }
    }
}

pub fn to_json(snapshot: &HistorySnapshot) -> Result<String, ExportError> {
    if snapshot.is_empty() {
        return Err(ExportError::NoData);
    }

    let records: Vec<TickRecord> = (0..snapshot.len())
        .filter_map(|i| snapshot.tick(i))
        .map(|(timestamp, samples)| TickRecord {
            time: time_label(&timestamp),
            targets: TickTargets(samples),
        })
        .collect();

    Ok(serde_json::to_string_pretty(&records)?)
}
