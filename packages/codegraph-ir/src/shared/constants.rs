//! Centralized tunable defaults.

/// Thread pool sizing for parallel file processing (C2, C7).
pub mod thread_pool {
    /// Fraction of available CPU cores to use for the rayon pool, leaving
    /// headroom for the OS and the watcher thread.
    pub const CPU_UTILIZATION_PERCENT: f64 = 0.75;

    pub const MIN_THREADS: usize = 1;
}

/// Text/log line-window parser defaults (spec §4.1.3).
pub mod text_window {
    /// Lines per fixed-size window.
    pub const DEFAULT_WINDOW_LINES: usize = 50;

    /// Max characters kept per window's implementation chunk before truncation.
    pub const DEFAULT_MAX_CHARS: usize = 1000;
}

/// Orchestrator (C7) file-processing batching.
pub mod pipeline {
    /// Default number of files processed per discovery batch.
    pub const DEFAULT_BATCH_SIZE: usize = 100;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_utilization() {
        let num_cpus = num_cpus::get();
        let threads = std::cmp::max(
            thread_pool::MIN_THREADS,
            (num_cpus as f64 * thread_pool::CPU_UTILIZATION_PERCENT) as usize,
        );
        assert!(threads >= 1);
        assert!(threads <= num_cpus);
    }

    #[test]
    fn test_text_window_defaults() {
        assert_eq!(text_window::DEFAULT_WINDOW_LINES, 50);
        assert_eq!(text_window::DEFAULT_MAX_CHARS, 1000);
    }
}
