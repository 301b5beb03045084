//! Cumulative block device counters from `/proc/diskstats`.

use anyhow::{Context, Result};
use std::path::Path;

const DISKSTATS_PATH: &str = "/proc/diskstats";
const SYS_BLOCK_DIR: &str = "/sys/block";

/// The kernel always counts in 512 byte sectors, whatever the device uses.
const SECTOR_SIZE: u64 = 512;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// Sums the counters of all whole disks. Partitions are left out so the same
/// traffic is not counted twice.
pub fn read_disk_counters() -> Result<DiskCounters> {
    let content = std::fs::read_to_string(DISKSTATS_PATH)
        .with_context(|| format!("Failed to read {}", DISKSTATS_PATH))?;
    parse_diskstats(&content, is_whole_disk)
}

fn is_whole_disk(name: &str) -> bool {
    if name.starts_with("loop") || name.starts_with("ram") {
        return false;
    }
    Path::new(SYS_BLOCK_DIR).join(name).exists()
}

pub fn parse_diskstats<F: Fn(&str) -> bool>(content: &str, include: F) -> Result<DiskCounters> {
    let mut counters = DiskCounters::default();
    for (index, line) in content.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        // major minor name reads merged sectors_read ms writes merged sectors_written ...
        if fields.len() < 10 {
            anyhow::bail!("Malformed diskstats line {}: {:?}", index + 1, line);
        }
        if !include(fields[2]) {
            continue;
        }
        let sectors_read: u64 = fields[5]
            .parse()
            .with_context(|| format!("Bad sectors read on diskstats line {}", index + 1))?;
        let sectors_written: u64 = fields[9]
            .parse()
            .with_context(|| format!("Bad sectors written on diskstats line {}", index + 1))?;
        counters.read_bytes = counters
            .read_bytes
            .saturating_add(sectors_read.saturating_mul(SECTOR_SIZE));
        counters.write_bytes = counters
            .write_bytes
            .saturating_add(sectors_written.saturating_mul(SECTOR_SIZE));
    }
    Ok(counters)
}
