//! Point-in-time host metrics for the dashboard widgets.
//!
//! Rate queries take two counter snapshots separated by a sampling window and
//! only suspend the calling task while waiting.

mod diskstats;

pub use diskstats::{parse_diskstats, read_disk_counters, DiskCounters};

use anyhow::Result;
use serde::Serialize;
use std::time::Duration;
use sysinfo::{Disks, Networks, System};

const MB: f64 = 1024.0 * 1024.0;
const GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    pub cpu_sample: Duration,
    pub io_window: Duration,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            cpu_sample: Duration::from_millis(500),
            io_window: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub cpu: f64,
    pub ram: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MountUsage {
    pub mountpoint: String,
    pub device: String,
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub percent_used: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskIoRate {
    pub read_mb_per_s: f64,
    pub write_mb_per_s: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkIoRate {
    pub sent_mb_per_s: f64,
    pub recv_mb_per_s: f64,
}

pub fn host_name() -> String {
    System::host_name().unwrap_or_else(|| "localhost".to_string())
}

/// CPU usage over `sample` and current RAM usage, both in percent.
pub async fn system_stats(sample: Duration) -> SystemStats {
    let mut sys = System::new();
    sys.refresh_cpu();
    tokio::time::sleep(sample.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)).await;
    sys.refresh_cpu();
    sys.refresh_memory();

    let cpu = sys.global_cpu_info().cpu_usage() as f64;
    let total = sys.total_memory();
    let ram = if total == 0 {
        0.0
    } else {
        total.saturating_sub(sys.available_memory()) as f64 / total as f64 * 100.0
    };

    SystemStats {
        cpu: round_to(cpu, 1),
        ram: round_to(ram, 1),
    }
}

/// Usage of the mounted filesystems. Mounts reporting no capacity are pseudo
/// or inaccessible and are skipped.
pub fn mount_usage() -> Vec<MountUsage> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter_map(|disk| {
            let total = disk.total_space();
            if total == 0 {
                return None;
            }
            let free = disk.available_space().min(total);
            let used = total - free;
            Some(MountUsage {
                mountpoint: disk.mount_point().to_string_lossy().to_string(),
                device: disk.name().to_string_lossy().to_string(),
                total_gb: round_to(total as f64 / GB, 2),
                used_gb: round_to(used as f64 / GB, 2),
                free_gb: round_to(free as f64 / GB, 2),
                percent_used: round_to(used as f64 / total as f64 * 100.0, 1),
            })
        })
        .collect()
}

pub async fn disk_io_rate(window: Duration) -> Result<DiskIoRate> {
    let before = read_disk_counters()?;
    tokio::time::sleep(window).await;
    let after = read_disk_counters()?;
    Ok(DiskIoRate {
        read_mb_per_s: rate_mb_per_s(before.read_bytes, after.read_bytes, window),
        write_mb_per_s: rate_mb_per_s(before.write_bytes, after.write_bytes, window),
    })
}

pub async fn network_io_rate(window: Duration) -> NetworkIoRate {
    let mut networks = Networks::new_with_refreshed_list();
    let (sent_before, recv_before) = network_totals(&networks);
    tokio::time::sleep(window).await;
    networks.refresh();
    let (sent_after, recv_after) = network_totals(&networks);
    NetworkIoRate {
        sent_mb_per_s: rate_mb_per_s(sent_before, sent_after, window),
        recv_mb_per_s: rate_mb_per_s(recv_before, recv_after, window),
    }
}

fn network_totals(networks: &Networks) -> (u64, u64) {
    networks
        .iter()
        .fold((0u64, 0u64), |(sent, recv), (_, data)| {
            (
                sent.saturating_add(data.total_transmitted()),
                recv.saturating_add(data.total_received()),
            )
        })
}

/// Megabytes per second between two cumulative counters. A counter that went
/// backwards (reset, device removed) gives 0.
pub fn rate_mb_per_s(before: u64, after: u64, window: Duration) -> f64 {
    let seconds = window.as_secs_f64();
    if seconds <= 0.0 {
        return 0.0;
    }
    round_to(after.saturating_sub(before) as f64 / MB / seconds, 2)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_megabytes_per_second() {
        let window = Duration::from_secs(1);
        assert_eq!(rate_mb_per_s(0, 3 * 1024 * 1024, window), 3.0);
        assert_eq!(rate_mb_per_s(0, 1024 * 1024, Duration::from_millis(500)), 2.0);
        assert_eq!(rate_mb_per_s(0, 1_000_000, window), 0.95);
    }

    #[test]
    fn counter_reset_clamps_to_zero() {
        assert_eq!(rate_mb_per_s(5_000, 10, Duration::from_secs(1)), 0.0);
        assert_eq!(rate_mb_per_s(0, 10, Duration::ZERO), 0.0);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(12.345, 1), 12.3);
        assert_eq!(round_to(12.346, 2), 12.35);
        assert_eq!(round_to(0.0, 2), 0.0);
    }

    #[tokio::test]
    async fn system_stats_are_percentages() {
        let stats = system_stats(Duration::from_millis(10)).await;
        assert!((0.0..=100.0).contains(&stats.ram));
        assert!(stats.cpu >= 0.0);
    }

    #[test]
    fn mounts_have_consistent_sizes() {
        for mount in mount_usage() {
            assert!(mount.total_gb >= 0.0);
            assert!(mount.percent_used >= 0.0 && mount.percent_used <= 100.0);
            assert!(!mount.mountpoint.is_empty());
        }
    }

    #[test]
    fn host_name_is_never_empty() {
        assert!(!host_name().is_empty());
    }
}
