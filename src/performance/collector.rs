// sysinfo-backed counter source
use super::gpu::NvidiaGpu;
use super::source::{CounterSource, PollRequest, ProcessCounters, RawTick, SystemCounters};
use crate::error::{AcquisitionError, FatalLoopError};
use crate::models::{HostInfo, InterfaceCounters};
use log::debug;
use std::collections::HashSet;
use sysinfo::{
    CpuRefreshKind, MemoryRefreshKind, Networks, Process, ProcessRefreshKind, RefreshKind, System,
    UpdateKind, Users,
};

/// Polls the local machine through sysinfo and NVML.
/// Caches the user table and GPU handle; both are expensive to rebuild per tick.
pub struct SystemCounterSource {
    system: System,
    networks: Networks,
    users: Users,
    nvidia_gpu: Option<NvidiaGpu>,
    current_user: Option<String>,
}

impl SystemCounterSource {
    pub fn new() -> Result<Self, FatalLoopError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(FatalLoopError::SourceUnavailable(
                "sysinfo does not support this operating system".to_string(),
            ));
        }

        let mut system = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::new().with_cpu_usage())
                .with_memory(MemoryRefreshKind::everything())
                .with_processes(process_refresh_kind()),
        );
        // Baseline for CPU usage deltas
        system.refresh_cpu();

        let users = Users::new_with_refreshed_list();
        let current_user = current_username(&system, &users);

        Ok(Self {
            system,
            networks: Networks::new_with_refreshed_list(),
            users,
            nvidia_gpu: NvidiaGpu::detect(),
            current_user,
        })
    }

    fn collect_process(&self, process: &Process) -> ProcessCounters {
        let pid = process.pid().as_u32();
        let disk = process.disk_usage();
        let username = process
            .user_id()
            .and_then(|uid| self.users.get_user_by_id(uid))
            .map(|user| user.name().to_string());

        let connections = match count_socket_descriptors(pid) {
            Ok(count) => Some(count),
            Err(e) => {
                debug!("Connection count unavailable: {}", e);
                None
            }
        };

        ProcessCounters {
            pid,
            name: process.name().to_string(),
            username,
            cpu_percent: process.cpu_usage(),
            memory_bytes: process.memory(),
            disk_read_bytes: Some(disk.total_read_bytes),
            disk_write_bytes: Some(disk.total_written_bytes),
            connections,
        }
    }

    fn collect_system(&mut self) -> SystemCounters {
        self.networks.refresh_list();
        let interfaces = (&self.networks)
            .into_iter()
            .map(|(name, data)| {
                InterfaceCounters::new(
                    name.as_str(),
                    data.total_transmitted(),
                    data.total_received(),
                )
            })
            .collect();

        let cpus = self.system.cpus();
        let cpu_percent = if cpus.is_empty() {
            0.0
        } else {
            cpus.iter().map(|cpu| cpu.cpu_usage()).sum::<f32>() / cpus.len() as f32
        };

        let total = self.system.total_memory();
        let used = self.system.used_memory();
        let memory_percent = if total > 0 {
            (used as f64 / total as f64 * 100.0) as f32
        } else {
            0.0
        };

        let (disk_read_bytes, disk_write_bytes) = match block_device_totals() {
            Some((read, written)) => (Some(read), Some(written)),
            None => self.summed_process_disk_totals(),
        };

        SystemCounters {
            cpu_percent,
            memory_used_bytes: used,
            memory_percent,
            interfaces,
            disk_read_bytes,
            disk_write_bytes,
            username: self.current_user.clone(),
        }
    }

    /// Fallback when block device statistics are unavailable
    fn summed_process_disk_totals(&self) -> (Option<u64>, Option<u64>) {
        let (read, written) = self
            .system
            .processes()
            .values()
            .map(|p| p.disk_usage())
            .fold((0u64, 0u64), |(r, w), d| {
                (
                    r.saturating_add(d.total_read_bytes),
                    w.saturating_add(d.total_written_bytes),
                )
            });
        (Some(read), Some(written))
    }

    fn gpu_percent(&self) -> Option<f32> {
        let gpu = self.nvidia_gpu.as_ref()?;
        match gpu.load_percent() {
            Ok(load) => Some(load),
            Err(e) => {
                debug!("GPU load unavailable: {}", e);
                None
            }
        }
    }
}

impl CounterSource for SystemCounterSource {
    fn poll(&mut self, request: &PollRequest) -> Result<RawTick, FatalLoopError> {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        self.system.refresh_processes_specifics(process_refresh_kind());

        if self.system.cpus().is_empty() {
            return Err(FatalLoopError::SourceUnavailable(
                "no CPU information reported by the OS".to_string(),
            ));
        }

        let mut processes: Vec<ProcessCounters> = self
            .system
            .processes()
            .values()
            .filter(|p| request.wants(&p.name().to_lowercase()))
            .map(|p| self.collect_process(p))
            .collect();
        processes.sort_by_key(|p| p.pid);

        let system = if request.include_system {
            Some(self.collect_system())
        } else {
            None
        };

        Ok(RawTick {
            processes,
            system,
            gpu_percent: self.gpu_percent(),
        })
    }
}

fn process_refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::new()
        .with_cpu()
        .with_memory()
        .with_disk_usage()
        .with_user(UpdateKind::OnlyIfNotSet)
}

fn current_username(system: &System, users: &Users) -> Option<String> {
    let from_process = sysinfo::get_current_pid()
        .ok()
        .and_then(|pid| system.process(pid))
        .and_then(|p| p.user_id())
        .and_then(|uid| users.get_user_by_id(uid))
        .map(|user| user.name().to_string());

    from_process
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
}

/// Number of TCP/UDP sockets (IPv4 and IPv6) held by a process.
/// Unix-domain and netlink sockets are not network traffic and are skipped.
#[cfg(target_os = "linux")]
fn count_socket_descriptors(pid: u32) -> Result<u32, AcquisitionError> {
    let entries = std::fs::read_dir(format!("/proc/{}/fd", pid))
        .map_err(|e| AcquisitionError::from_io(pid, &e))?;

    let held: Vec<u64> = entries
        .flatten()
        .filter_map(|entry| std::fs::read_link(entry.path()).ok())
        .filter_map(|target| socket_inode(&target.to_string_lossy()))
        .collect();
    if held.is_empty() {
        return Ok(0);
    }

    // Tables are per network namespace, so read them through the process
    let mut inet = HashSet::new();
    for table in INET_SOCKET_TABLES {
        match std::fs::read_to_string(format!("/proc/{}/net/{}", pid, table)) {
            Ok(contents) => inet.extend(parse_socket_table_inodes(&contents)),
            Err(e) => debug!("Skipping /proc/{}/net/{}: {}", pid, table, e),
        }
    }

    let count = held.iter().filter(|inode| inet.contains(inode)).count();
    Ok(count as u32)
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
const INET_SOCKET_TABLES: [&str; 4] = ["tcp", "tcp6", "udp", "udp6"];

/// Inode of an fd link target such as `socket:[12345]`
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn socket_inode(link: &str) -> Option<u64> {
    link.strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}

/// Inode column (the tenth) of a `/proc/net/{tcp,udp}[6]` table, header skipped
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_socket_table_inodes(table: &str) -> HashSet<u64> {
    table
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(9)?.parse().ok())
        .collect()
}

#[cfg(not(target_os = "linux"))]
fn count_socket_descriptors(_pid: u32) -> Result<u32, AcquisitionError> {
    Err(AcquisitionError::Unsupported("per-process connection counting"))
}

/// Cumulative (read, written) bytes over whole block devices
#[cfg(target_os = "linux")]
fn block_device_totals() -> Option<(u64, u64)> {
    let stats = std::fs::read_to_string("/proc/diskstats").ok()?;
    Some(parse_diskstats(&stats, |name| {
        std::path::Path::new("/sys/block").join(name).exists()
    }))
}

#[cfg(not(target_os = "linux"))]
fn block_device_totals() -> Option<(u64, u64)> {
    None
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
const SECTOR_BYTES: u64 = 512;

/// Sums sectors read/written (fields 6 and 10) for whole, non-virtual disks
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_diskstats(stats: &str, is_whole_disk: impl Fn(&str) -> bool) -> (u64, u64) {
    stats
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let name = *fields.get(2)?;
            if name.starts_with("loop") || name.starts_with("ram") || !is_whole_disk(name) {
                return None;
            }
            let read = fields.get(5)?.parse::<u64>().ok()?;
            let written = fields.get(9)?.parse::<u64>().ok()?;
            Some((read * SECTOR_BYTES, written * SECTOR_BYTES))
        })
        .fold((0, 0), |(r, w), (dr, dw)| (r + dr, w + dw))
}

/// Describe the host for the info bar
pub fn describe_host() -> HostInfo {
    let mut system = System::new_with_specifics(
        RefreshKind::new()
            .with_cpu(CpuRefreshKind::new().with_frequency())
            .with_memory(MemoryRefreshKind::new().with_ram()),
    );
    system.refresh_cpu();

    let os = match (System::name(), System::os_version()) {
        (Some(name), Some(version)) => format!("{} {}", name, version),
        (Some(name), None) => name,
        _ => "Unknown OS".to_string(),
    };

    let cpu_frequency_ghz = system
        .cpus()
        .first()
        .map(|cpu| cpu.frequency() as f64 / 1000.0)
        .unwrap_or(0.0);

    let gpu_name = NvidiaGpu::detect()
        .map(|gpu| gpu.name().to_string())
        .unwrap_or_else(|| "No GPU detected".to_string());

    HostInfo {
        os,
        physical_cores: system.physical_core_count(),
        cpu_frequency_ghz,
        total_memory_gb: ((system.total_memory() as f64 / 1_073_741_824.0) * 100.0).round() / 100.0,
        gpu_name,
    }
}
