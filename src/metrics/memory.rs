//! Host memory sampling
//!
//! The host platform may or may not be able to report process memory. A
//! provider that cannot answer returns `None` and the snapshot simply omits
//! the memory field.

use std::fs;

/// Raw memory reading from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReading {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

/// Source of process memory readings
pub trait MemoryProvider: Send + Sync {
    fn sample(&self) -> Option<MemoryReading>;
}

/// Provider for hosts with no memory introspection
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMemoryProvider;

impl MemoryProvider for NoMemoryProvider {
    fn sample(&self) -> Option<MemoryReading> {
        None
    }
}

/// Page size used when the host cannot report one
const FALLBACK_PAGE_SIZE: u64 = 4096;

/// cgroup files holding the memory limit, v2 first
const CGROUP_LIMIT_FILES: [&str; 2] = [
    "/sys/fs/cgroup/memory.max",
    "/sys/fs/cgroup/memory/memory.limit_in_bytes",
];

/// Reads the process resident set size from procfs (Linux only).
///
/// `used_bytes` is this process's RSS. `total_bytes` is the memory the process
/// may use: the cgroup memory limit when one is set, otherwise the system
/// `MemTotal`. Without a cgroup limit the percentage is therefore a share of
/// the whole machine, and a single renderer rarely approaches the memory
/// thresholds.
#[derive(Debug, Clone)]
pub struct ProcMemoryProvider {
    page_size: u64,
}

impl ProcMemoryProvider {
    pub fn new() -> Self {
        Self {
            page_size: host_page_size(),
        }
    }

    fn resident_bytes(&self) -> Option<u64> {
        let statm = fs::read_to_string("/proc/self/statm").ok()?;
        parse_statm_resident(&statm).map(|pages| pages * self.page_size)
    }

    fn total_bytes(&self) -> Option<u64> {
        let meminfo = fs::read_to_string("/proc/meminfo").ok()?;
        let system = parse_meminfo_total(&meminfo)?;

        let limit = CGROUP_LIMIT_FILES
            .iter()
            .filter_map(|path| fs::read_to_string(path).ok())
            .find_map(|contents| parse_cgroup_limit(&contents));

        Some(limit.map_or(system, |limit| limit.min(system)))
    }
}

impl Default for ProcMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider for ProcMemoryProvider {
    fn sample(&self) -> Option<MemoryReading> {
        if !cfg!(target_os = "linux") {
            return None;
        }
        Some(MemoryReading {
            used_bytes: self.resident_bytes()?,
            total_bytes: self.total_bytes()?,
        })
    }
}

#[cfg(unix)]
fn host_page_size() -> u64 {
    // SAFETY: sysconf only reads a system constant
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        FALLBACK_PAGE_SIZE
    }
}

#[cfg(not(unix))]
fn host_page_size() -> u64 {
    FALLBACK_PAGE_SIZE
}

/// `memory.max` holds bytes or `max`; zero means no usable limit
fn parse_cgroup_limit(contents: &str) -> Option<u64> {
    contents.trim().parse().ok().filter(|&limit: &u64| limit > 0)
}

/// Second field of `/proc/self/statm` is the resident page count
fn parse_statm_resident(statm: &str) -> Option<u64> {
    statm.split_whitespace().nth(1)?.parse().ok()
}

/// `MemTotal:  16318480 kB` -> bytes
fn parse_meminfo_total(meminfo: &str) -> Option<u64> {
    let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kib: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kib * 1024)
}
