// Headless runner: sample the requested targets, log every frame, export on exit
use clap::{Parser, ValueEnum};
use log::{error, info, warn, LevelFilter};
use resmon_lib::commands::monitor::{export_history, get_host_info, start_from_settings};
use resmon_lib::commands::settings::{get_settings, update_settings, UpdateSettingsParams};
use resmon_lib::utils::initialize_data_directories;
use resmon_lib::{logging, ExportFormat, Frame, MonitorError, MonitorEvent, ResourceMonitor};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Csv => ExportFormat::Csv,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "resmon", version, about = "Sample CPU, memory, network, disk and GPU usage of named processes")]
struct Cli {
    /// Process name filters (case-insensitive substring match)
    targets: Vec<String>,

    /// Also monitor the whole system
    #[arg(short, long)]
    system: bool,

    /// Seconds between samples (0.1 - 10)
    #[arg(short, long)]
    interval: Option<f64>,

    /// Ticks of history to keep (10 - 1000)
    #[arg(short, long)]
    capacity: Option<usize>,

    /// Stop after this many seconds; runs until failure otherwise
    #[arg(short, long)]
    duration: Option<f64>,

    /// Export history on exit to this file, or into this directory.
    /// A bare file name is placed in the export directory.
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Export directory for bare file names; saved with --save-settings
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Export format; inferred from the file extension when omitted
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Persist the effective targets and options as the new defaults
    #[arg(long)]
    save_settings: bool,

    #[arg(long, default_value = "info", env = "RESMON_LOG_LEVEL")]
    log_level: LevelFilter,

    /// Write logs to a file in the application data directory
    #[arg(long)]
    log_file: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match logging::init(cli.log_level, cli.log_file) {
        Ok(Some(path)) => eprintln!("Logging to {}", path.display()),
        Ok(None) => {}
        Err(e) => eprintln!("Failed to set up file logging: {}", e),
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), MonitorError> {
    initialize_data_directories()?;

    let mut settings = get_settings().unwrap_or_else(|e| {
        warn!("Ignoring unreadable settings: {}", e);
        Default::default()
    });
    if !cli.targets.is_empty() {
        settings.targets = cli.targets.clone();
    }
    if cli.system {
        settings.include_system = true;
    }
    if let Some(interval) = cli.interval {
        settings.interval_seconds = interval;
    }
    if let Some(capacity) = cli.capacity {
        settings.history_capacity = capacity;
    }
    if let Some(dir) = &cli.export_dir {
        settings.export_dir = Some(dir.to_string_lossy().into_owned());
    }

    if cli.save_settings {
        settings = update_settings(UpdateSettingsParams {
            targets: Some(settings.targets.clone()),
            interval_seconds: Some(settings.interval_seconds),
            history_capacity: Some(settings.history_capacity),
            include_system: Some(settings.include_system),
            export_dir: settings.export_dir.clone(),
        })?;
        info!("Settings saved");
    }

    info!("{}", get_host_info().summary());

    let monitor = ResourceMonitor::new();
    let subscription = monitor.subscribe();
    start_from_settings(&monitor, &settings)?;

    let deadline = cli
        .duration
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(|secs| Instant::now() + Duration::from_secs_f64(secs));
    let poll = Duration::from_secs_f64(settings.interval_seconds.max(0.1) * 2.0);
    let mut failure = None;

    loop {
        if deadline.map_or(false, |d| Instant::now() >= d) {
            break;
        }
        match subscription.recv_timeout(poll) {
            Some(MonitorEvent::Frame(frame)) => log_frame(&frame),
            Some(MonitorEvent::Failed(e)) => {
                failure = Some(e);
                break;
            }
            None if !monitor.is_running() => break,
            None => {}
        }
    }

    monitor.stop();

    if let Some(target) = cli.export {
        let format = cli
            .format
            .map(ExportFormat::from)
            .or_else(|| ExportFormat::from_path(&target))
            .unwrap_or_default();
        let export_dir = settings.export_dir.as_deref().map(Path::new);
        let written = export_history(&monitor, format, Some(target), export_dir)?;
        info!("History exported to {}", written.display());
    }

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn log_frame(frame: &Frame) {
    for entry in &frame.samples {
        let s = &entry.sample;
        let pid = s.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
        info!(
            "{} {} [pid {}] cpu {:.1}% mem {:.1}MB net {:.2}Mbps{} disk {:.2}MB/s gpu {:.0}%",
            frame.time_label(),
            entry.target,
            pid,
            s.cpu,
            s.memory,
            s.network,
            if s.network_estimated { " (est.)" } else { "" },
            s.disk,
            s.gpu
        );
    }
}
