//! Set an Android device's clock from network time over `adb`.
//!
//! Detects a root mechanism on the device, asks NTP servers for the time and
//! applies it with a privileged `date`. Exit codes are listed in
//! [`adb_time_sync::exit_codes`].

use std::path::PathBuf;

use adb_time_sync::check::{CheckReport, comprehensive_check};
use adb_time_sync::core::types::{DateSyntax, SyncResult, ZoneSource};
use adb_time_sync::detect::detect_privilege;
use adb_time_sync::device::select_device;
use adb_time_sync::error::SyncError;
use adb_time_sync::exit_codes;
use adb_time_sync::io::adb::AdbBridge;
use adb_time_sync::io::config::{DEFAULT_CONFIG_FILE, SyncConfig, load_config};
use adb_time_sync::io::ntp::SntpTimeSource;
use adb_time_sync::logging;
use adb_time_sync::sync::{SyncOptions, run_sync};
use anyhow::{Context, Result};
use clap::Parser;

const EXAMPLES: &str = "\
Examples:
  adb-time-sync                               Sync time using default settings
  adb-time-sync --verify                      Sync time and verify
  adb-time-sync --device-id ABC123            Sync time on a specific device
  adb-time-sync --ntp-server time.google.com  Use a specific NTP server
  adb-time-sync --comprehensive-check         Diagnose without changing the clock";

#[derive(Parser, Debug)]
#[command(
    name = "adb-time-sync",
    version,
    about = "Synchronize an Android device's clock with NTP servers over adb",
    after_help = EXAMPLES
)]
struct Cli {
    /// Verify time synchronization after setting.
    #[arg(long)]
    verify: bool,

    /// Device serial (required when more than one device is attached).
    #[arg(long, value_name = "SERIAL")]
    device_id: Option<String>,

    /// NTP server to use instead of the built-in list. Repeat to set an order.
    #[arg(long = "ntp-server", value_name = "HOST")]
    ntp_servers: Vec<String>,

    /// NTP query timeout in seconds (default: 5).
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Only detect and print the privilege method.
    #[arg(long, conflicts_with = "comprehensive_check")]
    check_root_only: bool,

    /// Probe every privilege method and time source without changing the clock.
    #[arg(long)]
    comprehensive_check: bool,

    /// Drift in seconds tolerated by --verify before warning (default: 5).
    #[arg(long, value_name = "SECS")]
    tolerance: Option<u64>,

    /// Path to the adb binary.
    #[arg(long, value_name = "PATH")]
    adb: Option<String>,

    /// Config file; missing files are ignored.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Syntax of the device's `date` command.
    #[arg(long, value_enum)]
    date_syntax: Option<DateSyntax>,

    /// Where the device's UTC offset comes from.
    #[arg(long, value_enum)]
    zone: Option<ZoneSource>,

    /// Resolve everything and print the set command without running it.
    #[arg(long)]
    dry_run: bool,

    /// Print the sync result as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = if err.use_stderr() {
                exit_codes::INVALID
            } else {
                exit_codes::OK
            };
            std::process::exit(code);
        }
    };
    logging::init();

    let code = match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            err.downcast_ref::<SyncError>()
                .map_or(exit_codes::INVALID, SyncError::exit_code)
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<i32> {
    let mut cfg = load_config(&cli.config).context("load config")?;
    apply_overrides(&mut cfg, cli);
    cfg.validate().context("validate options")?;

    let bridge = AdbBridge::new(
        cfg.adb_path.clone(),
        cfg.command_timeout(),
        cfg.output_limit_bytes,
    );
    let source = SntpTimeSource;

    let device = select_device(&bridge, cli.device_id.as_deref())?;
    println!("device: serial={device}");

    if cli.check_root_only {
        let method = detect_privilege(&bridge, &device)?;
        println!("privilege: method={method}");
        return Ok(exit_codes::OK);
    }

    if cli.comprehensive_check {
        let report = comprehensive_check(
            &bridge,
            &source,
            &device,
            &cfg.servers,
            cfg.ntp_timeout(),
        );
        print_check_report(&report);
        if let Some(err) = report.failure() {
            return Err(err.into());
        }
        return Ok(exit_codes::OK);
    }

    let options = SyncOptions {
        verify: cli.verify,
        dry_run: cli.dry_run,
        ..SyncOptions::from_config(&cfg)
    };
    let result = run_sync(&bridge, &source, &device, &options)?;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("serialize sync result")?
        );
    } else {
        print_sync_result(&result);
    }
    if let Some(report) = &result.verification
        && !report.within_tolerance
    {
        eprintln!(
            "warning: {}",
            SyncError::DriftExceeded {
                drift_ms: report.drift_ms,
                tolerance_ms: report.tolerance_ms,
            }
        );
    }
    if let Some(err) = &result.verification_error {
        eprintln!("warning: verification failed: {err}");
    }
    Ok(exit_codes::OK)
}

/// CLI flags win over config file values.
fn apply_overrides(cfg: &mut SyncConfig, cli: &Cli) {
    if !cli.ntp_servers.is_empty() {
        cfg.servers = cli.ntp_servers.clone();
    }
    if let Some(timeout) = cli.timeout {
        cfg.ntp_timeout_secs = timeout;
    }
    if let Some(tolerance) = cli.tolerance {
        cfg.drift_tolerance_secs = tolerance;
    }
    if let Some(adb) = &cli.adb {
        cfg.adb_path = adb.clone();
    }
    if let Some(syntax) = cli.date_syntax {
        cfg.date_syntax = syntax;
    }
    if let Some(zone) = cli.zone {
        cfg.zone = zone;
    }
}

fn print_sync_result(result: &SyncResult) {
    println!("privilege: method={}", result.method);
    println!(
        "time: source={} utc={} local={}",
        result.source,
        result.target_utc.to_rfc3339(),
        result.target_local
    );
    if result.dry_run {
        println!("set: dry_run command={}", result.command);
    } else {
        println!("set: ok command={}", result.command);
    }
    if let Some(report) = &result.verification {
        println!(
            "verify: source={} drift_ms={} tolerance_ms={} within_tolerance={}",
            report.reference_source,
            report.drift_ms,
            report.tolerance_ms,
            report.within_tolerance
        );
    }
}

fn print_check_report(report: &CheckReport) {
    println!(
        "check: android={} selinux={} utc_offset={}",
        report.android_release.as_deref().unwrap_or("unknown"),
        report.selinux.as_deref().unwrap_or("unknown"),
        report.utc_offset.as_deref().unwrap_or("unknown")
    );
    for probe in &report.probes {
        println!(
            "check: privilege={} available={} detail={:?}",
            probe.method, probe.available, probe.detail
        );
    }
    for source in &report.sources {
        match &source.result {
            Ok(latency) => println!(
                "check: ntp={} ok latency_ms={}",
                source.host,
                latency.as_millis()
            ),
            Err(err) => println!("check: ntp={} failed error={:?}", source.host, err),
        }
    }
}
