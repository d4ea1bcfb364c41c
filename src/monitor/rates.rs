// Rate calculation from successive counter snapshots
use crate::models::{CounterSnapshot, InterfaceCounters, NetworkCounters, RateSample, BYTES_PER_MIB};

/// Estimated "Mbps" credited per closed connection
const CONNECTION_ESTIMATE_FACTOR: f64 = 0.1;
/// Upper bound of the connection estimate
const CONNECTION_ESTIMATE_CAP: f64 = 100.0;

/// Derive one tick's rates. Pure: same inputs, same output.
///
/// `prev` is `None` on the first observation of a target (or after it switched
/// to a different process); counter-based metrics are then 0. CPU, memory and
/// GPU are instantaneous and always reported.
pub fn compute_rate(prev: Option<&CounterSnapshot>, curr: &CounterSnapshot, dt_seconds: f64) -> RateSample {
    let (network, network_estimated) = match prev {
        Some(prev) => network_rate(&prev.network, &curr.network, dt_seconds),
        None => (0.0, matches!(curr.network, NetworkCounters::Connections(_))),
    };

    let disk = match prev {
        Some(prev) => {
            let read = counter_delta(prev.disk_read_bytes, curr.disk_read_bytes);
            let written = counter_delta(prev.disk_write_bytes, curr.disk_write_bytes);
            per_second((read + written) as f64 / BYTES_PER_MIB, dt_seconds)
        }
        None => 0.0,
    };

    RateSample {
        cpu: curr.cpu_percent as f64,
        memory: curr.memory_bytes as f64 / BYTES_PER_MIB,
        network,
        disk,
        gpu: curr.gpu_percent as f64,
        pid: curr.pid,
        username: curr.username.clone(),
        memory_percent: curr.memory_percent.map(|p| p as f64),
        network_estimated,
    }
}

/// Growth of a cumulative counter; resets and missing readings count as 0
fn counter_delta(prev: Option<u64>, curr: Option<u64>) -> u64 {
    match (prev, curr) {
        (Some(prev), Some(curr)) => curr.saturating_sub(prev),
        _ => 0,
    }
}

fn per_second(amount: f64, dt_seconds: f64) -> f64 {
    if dt_seconds > 0.0 && dt_seconds.is_finite() {
        amount / dt_seconds
    } else {
        0.0
    }
}

/// Returns (Mbps, is_estimate)
fn network_rate(prev: &NetworkCounters, curr: &NetworkCounters, dt_seconds: f64) -> (f64, bool) {
    match (prev, curr) {
        (NetworkCounters::Interfaces(prev), NetworkCounters::Interfaces(curr)) => {
            let bytes = interface_bytes_delta(prev, curr);
            (per_second(bytes as f64 * 8.0 / BYTES_PER_MIB, dt_seconds), false)
        }
        (NetworkCounters::Connections(prev), NetworkCounters::Connections(curr)) => {
            (estimate_from_connections(*prev, *curr), true)
        }
        (_, NetworkCounters::Connections(_)) => (0.0, true),
        _ => (0.0, false),
    }
}

/// Bytes moved across all interfaces, each clamped on its own. An interface
/// absent from the previous poll has no baseline and contributes nothing.
fn interface_bytes_delta(prev: &[InterfaceCounters], curr: &[InterfaceCounters]) -> u64 {
    curr.iter()
        .filter_map(|now| {
            let before = prev.iter().find(|p| p.name == now.name)?;
            Some(
                counter_delta(Some(before.sent), Some(now.sent))
                    .saturating_add(counter_delta(Some(before.recv), Some(now.recv))),
            )
        })
        .fold(0u64, u64::saturating_add)
}

/// Coarse per-process network proxy: closed connections are taken as a sign
/// of finished transfers. Not a byte rate and not scaled by elapsed time.
pub fn estimate_from_connections(prev: u32, curr: u32) -> f64 {
    if curr >= prev {
        return 0.0;
    }
    ((prev - curr) as f64 * CONNECTION_ESTIMATE_FACTOR).min(CONNECTION_ESTIMATE_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn snapshot(network: NetworkCounters, disk: (u64, u64)) -> CounterSnapshot {
        CounterSnapshot {
            pid: Some(42),
            username: "alice".into(),
            cpu_percent: 12.5,
            memory_bytes: 512 * 1_048_576,
            memory_percent: None,
            network,
            disk_read_bytes: Some(disk.0),
            disk_write_bytes: Some(disk.1),
            gpu_percent: 30.0,
            timestamp: Local::now(),
        }
    }

    fn bytes(sent: u64, recv: u64) -> NetworkCounters {
        NetworkCounters::Interfaces(vec![InterfaceCounters::new("eth0", sent, recv)])
    }

    fn nics(counters: &[(&str, u64, u64)]) -> NetworkCounters {
        NetworkCounters::Interfaces(
            counters
                .iter()
                .map(|(name, sent, recv)| InterfaceCounters::new(*name, *sent, *recv))
                .collect(),
        )
    }

    #[test]
    fn test_first_observation_has_no_counter_rates() {
        let curr = snapshot(bytes(5_000_000, 5_000_000), (9_000_000, 9_000_000));
        let sample = compute_rate(None, &curr, 1.0);
        assert_eq!(sample.network, 0.0);
        assert_eq!(sample.disk, 0.0);
        assert_eq!(sample.cpu, 12.5);
        assert_eq!(sample.memory, 512.0);
        assert_eq!(sample.gpu, 30.0);
        assert_eq!(sample.pid, Some(42));
    }

    #[test]
    fn test_one_mib_sent_in_one_second_is_eight_mbps() {
        let prev = snapshot(bytes(0, 0), (0, 0));
        let curr = snapshot(bytes(1_048_576, 0), (0, 0));
        assert_eq!(compute_rate(Some(&prev), &curr, 1.0).network, 8.0);
    }

    #[test]
    fn test_disk_rate_sums_read_and_write() {
        let prev = snapshot(bytes(0, 0), (0, 0));
        let curr = snapshot(bytes(0, 0), (1_048_576, 3 * 1_048_576));
        assert_eq!(compute_rate(Some(&prev), &curr, 2.0).disk, 2.0);
    }

    #[test]
    fn test_counter_reset_clamps_to_zero() {
        let prev = snapshot(bytes(10_000, 10_000), (10_000, 10_000));
        let curr = snapshot(bytes(5, 20_000), (1, 1));
        let sample = compute_rate(Some(&prev), &curr, 1.0);
        assert!(sample.network >= 0.0);
        assert_eq!(sample.network, 10_000.0 * 8.0 / BYTES_PER_MIB);
        assert_eq!(sample.disk, 0.0);
    }

    #[test]
    fn test_reset_on_one_nic_does_not_hide_traffic_on_another() {
        let prev = snapshot(nics(&[("eth0", 100 * 1_048_576, 0), ("wlan0", 0, 0)]), (0, 0));
        let curr = snapshot(nics(&[("eth0", 0, 0), ("wlan0", 1_048_576, 0)]), (0, 0));
        let sample = compute_rate(Some(&prev), &curr, 1.0);
        assert_eq!(sample.network, 8.0);
        assert!(!sample.network_estimated);
    }

    #[test]
    fn test_new_nic_has_no_baseline() {
        let prev = snapshot(nics(&[("eth0", 0, 0)]), (0, 0));
        let curr = snapshot(nics(&[("eth0", 1_048_576, 0), ("tun0", 0, 500 * 1_048_576)]), (0, 0));
        assert_eq!(compute_rate(Some(&prev), &curr, 1.0).network, 8.0);

        // A NIC that disappears contributes nothing either
        let curr = snapshot(nics(&[]), (0, 0));
        assert_eq!(compute_rate(Some(&prev), &curr, 1.0).network, 0.0);
    }

    #[test]
    fn test_pure_for_identical_inputs() {
        let prev = snapshot(bytes(100, 200), (300, 400));
        let curr = snapshot(bytes(1_100, 2_200), (3_300, 4_400));
        assert_eq!(
            compute_rate(Some(&prev), &curr, 0.5),
            compute_rate(Some(&prev), &curr, 0.5)
        );
    }

    #[test]
    fn test_zero_elapsed_time_yields_zero_rates() {
        let prev = snapshot(bytes(0, 0), (0, 0));
        let curr = snapshot(bytes(1_048_576, 0), (1_048_576, 0));
        let sample = compute_rate(Some(&prev), &curr, 0.0);
        assert_eq!(sample.network, 0.0);
        assert_eq!(sample.disk, 0.0);
    }

    #[test]
    fn test_missing_disk_counter_is_zero() {
        let prev = snapshot(bytes(0, 0), (0, 0));
        let mut curr = snapshot(bytes(0, 0), (1_048_576, 1_048_576));
        curr.disk_read_bytes = None;
        assert_eq!(compute_rate(Some(&prev), &curr, 1.0).disk, 1.0);
    }

    #[test]
    fn test_connection_estimate() {
        assert_eq!(estimate_from_connections(5, 5), 0.0);
        assert_eq!(estimate_from_connections(5, 9), 0.0);
        assert!((estimate_from_connections(9, 5) - 0.4).abs() < 1e-9);
        assert_eq!(estimate_from_connections(u32::MAX, 0), 100.0);

        let prev = snapshot(NetworkCounters::Connections(10), (0, 0));
        let curr = snapshot(NetworkCounters::Connections(7), (0, 0));
        let sample = compute_rate(Some(&prev), &curr, 1.0);
        assert!(sample.network_estimated);
        assert!((sample.network - 0.3).abs() < 1e-9);
    }
}
