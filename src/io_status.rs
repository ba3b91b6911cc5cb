// io_status.rs - IO accounting for adjacency scans
use std::fmt;
use std::ops::AddAssign;
use std::time::{Duration, Instant};

use log::info;
use serde::Serialize;

/// Process-level IO counters, as exposed by the operating system.
///
/// On Linux these come from `/proc/self/io`; elsewhere every counter stays
/// zero and only timings are meaningful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IOStats {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_syscalls: u64,
    pub write_syscalls: u64,
}

impl IOStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter deltas between two snapshots, saturating at zero.
    pub fn diff(&self, other: &IOStats) -> IOStats {
        IOStats {
            read_bytes: self.read_bytes.saturating_sub(other.read_bytes),
            write_bytes: self.write_bytes.saturating_sub(other.write_bytes),
            read_syscalls: self.read_syscalls.saturating_sub(other.read_syscalls),
            write_syscalls: self.write_syscalls.saturating_sub(other.write_syscalls),
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.read_bytes + self.write_bytes
    }

    pub fn total_syscalls(&self) -> u64 {
        self.read_syscalls + self.write_syscalls
    }

    pub fn has_io(&self) -> bool {
        self.total_bytes() > 0 || self.total_syscalls() > 0
    }
}

impl AddAssign for IOStats {
    fn add_assign(&mut self, rhs: IOStats) {
        self.read_bytes += rhs.read_bytes;
        self.write_bytes += rhs.write_bytes;
        self.read_syscalls += rhs.read_syscalls;
        self.write_syscalls += rhs.write_syscalls;
    }
}

impl fmt::Display for IOStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,
               "read {} bytes ({} syscalls), write {} bytes ({} syscalls)",
               self.read_bytes, self.read_syscalls,
               self.write_bytes, self.write_syscalls
        )
    }
}

/// What one sequential pass over the adjacency source cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Lines consumed before the pass ended (early stop included).
    pub lines_read: u64,
    /// Bytes consumed from the source, line terminators included.
    pub bytes_read: u64,
    /// Wall time of the pass in microseconds.
    pub elapsed_us: u64,
    /// Process IO observed during the pass.
    pub io: IOStats,
}

impl AddAssign for ScanStats {
    fn add_assign(&mut self, rhs: ScanStats) {
        self.lines_read += rhs.lines_read;
        self.bytes_read += rhs.bytes_read;
        self.elapsed_us += rhs.elapsed_us;
        self.io += rhs.io;
    }
}

/// Return value, wall time and IO of a measured closure.
pub struct ExecutionResult<T> {
    pub result: T,
    pub duration: Duration,
    pub io_stats: IOStats,
}

impl<T> ExecutionResult<T> {
    /// Logs a one-line summary at info level.
    pub fn log_summary(&self, operation_name: &str) {
        let throughput = if self.io_stats.has_io() && self.duration.as_secs_f64() > 0.0 {
            self.io_stats.total_bytes() as f64 / self.duration.as_secs_f64() / 1024.0 / 1024.0
        } else {
            0.0
        };
        info!(
            "{}: {:?}, {} ({:.2} MB/s)",
            operation_name, self.duration, self.io_stats, throughput
        );
    }
}

pub struct IOStatsCollector;

impl IOStatsCollector {
    #[cfg(target_os = "linux")]
    fn get_current_io_stats() -> std::io::Result<IOStats> {
        let io_content = std::fs::read_to_string("/proc/self/io")?;
        let mut stats = IOStats::new();

        for line in io_content.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() == 2 {
                if let Ok(value) = parts[1].parse::<u64>() {
                    match parts[0] {
                        "read_bytes:" => stats.read_bytes = value,
                        "write_bytes:" => stats.write_bytes = value,
                        "syscr:" => stats.read_syscalls = value,
                        "syscw:" => stats.write_syscalls = value,
                        _ => {}
                    }
                }
            }
        }

        Ok(stats)
    }

    #[cfg(not(target_os = "linux"))]
    fn get_current_io_stats() -> std::io::Result<IOStats> {
        Ok(IOStats::new())
    }

    /// Runs `f`, capturing its wall time and the process IO it caused.
    ///
    /// An unreadable counter source degrades to zero counters; it never fails
    /// the measured computation.
    pub fn measure<F, R>(f: F) -> ExecutionResult<R>
    where
        F: FnOnce() -> R,
    {
        let start_io = Self::get_current_io_stats().unwrap_or_default();
        let start_time = Instant::now();

        let result = f();

        let duration = start_time.elapsed();
        let end_io = Self::get_current_io_stats().unwrap_or_default();

        ExecutionResult {
            result,
            duration,
            io_stats: end_io.diff(&start_io),
        }
    }

    /// Measures `f` and logs a summary under `operation_name`.
    pub fn measure_and_log<F, R>(operation_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let execution_result = Self::measure(f);
        execution_result.log_summary(operation_name);
        execution_result.result
    }
}

/// Measures a block and logs its wall time and IO.
///
/// ```ignore
/// let report = measure_io!("cluster", { pipeline.run() })?;
/// ```
#[macro_export]
macro_rules! measure_io {
    ($name:expr, $code:block) => {{
        $crate::io_status::IOStatsCollector::measure_and_log($name, || $code)
    }};
}
