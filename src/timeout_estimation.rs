//! Per-file upload timeout estimation.
//!
//! The backend's processing time grows with file size, and P&ID drawings
//! take noticeably longer than ordinary documents. The estimate is a
//! clamped linear function of size with a separate rate for P&IDs.

use std::sync::LazyLock;
use std::time::Duration;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::upload_config::{TimeoutPolicy, TimeoutRate};

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// File-name fragments that mark a Piping & Instrumentation Diagram.
pub const PID_KEYWORDS: &[&str] = &[
    "p&id",
    "pid",
    "p_id",
    "p-id",
    "piping",
    "instrumentation",
    "isometric",
    "schematic",
];

static PID_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let alternation = PID_KEYWORDS
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .ok()
});

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Timeout estimate with the inputs that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct TimeoutEstimate {
    pub size_bytes: u64,
    pub is_pid: bool,
    /// Unclamped `base + size_mb * per_mb` in seconds.
    pub raw_secs: f64,
    /// Effective timeout after clamping.
    pub timeout: Duration,
}

// ═══════════════════════════════════════════════════════════
// Estimation
// ═══════════════════════════════════════════════════════════

/// True when the file name contains any P&ID keyword (case-insensitive).
pub fn looks_like_pid(file_name: &str) -> bool {
    match PID_PATTERN.as_ref() {
        Some(re) => re.is_match(file_name),
        None => {
            let lower = file_name.to_lowercase();
            PID_KEYWORDS.iter().any(|k| lower.contains(k))
        }
    }
}

/// Estimate the upload timeout for a file of `size_bytes`.
///
/// Formula: `base + size_mb * per_mb`, clamped to `[policy.min, policy.max]`.
pub fn estimate_timeout(policy: &TimeoutPolicy, size_bytes: u64, is_pid: bool) -> TimeoutEstimate {
    let rate: &TimeoutRate = if is_pid { &policy.pid } else { &policy.generic };
    let size_mb = size_bytes as f64 / BYTES_PER_MB;
    let raw_secs = rate.base_secs.max(0.0) + size_mb * rate.per_mb_secs.max(0.0);

    let min = policy.min.as_secs_f64();
    let max = policy.max.as_secs_f64().max(min);
    let clamped = raw_secs.clamp(min, max);

    TimeoutEstimate {
        size_bytes,
        is_pid,
        raw_secs,
        timeout: Duration::from_secs_f64(clamped),
    }
}

/// Convenience: derive the P&ID flag from the name, then estimate.
pub fn estimate_for_file(policy: &TimeoutPolicy, file_name: &str, size_bytes: u64) -> TimeoutEstimate {
    estimate_timeout(policy, size_bytes, looks_like_pid(file_name))
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn sizes() -> Vec<u64> {
        vec![
            0,
            1,
            512 * 1024,
            MB,
            3 * MB,
            10 * MB,
            27 * MB,
            50 * MB,
            200 * MB,
            10_000 * MB,
        ]
    }

    #[test]
    fn pid_keywords_match_case_insensitively() {
        assert!(looks_like_pid("pid_diagram.pdf"));
        assert!(looks_like_pid("Unit-300 P&ID rev B.pdf"));
        assert!(looks_like_pid("PIPING_layout.dwg"));
        assert!(looks_like_pid("Instrumentation Index.xlsx"));
        assert!(!looks_like_pid("quarterly_report.pdf"));
        assert!(!looks_like_pid(""));
    }

    #[test]
    fn half_megabyte_pid_gets_one_to_two_minutes() {
        let est = estimate_for_file(&TimeoutPolicy::default(), "pid_diagram.pdf", 512 * 1024);
        assert!(est.is_pid);
        let secs = est.timeout.as_secs_f64();
        assert!((60.0..=120.0).contains(&secs), "got {secs}s");
        assert!((secs - 100.0).abs() < 1e-6);
    }

    #[test]
    fn pid_never_below_generic() {
        let policy = TimeoutPolicy::default();
        for size in sizes() {
            let pid = estimate_timeout(&policy, size, true).timeout;
            let generic = estimate_timeout(&policy, size, false).timeout;
            assert!(pid >= generic, "size {size}: {pid:?} < {generic:?}");
        }
    }

    #[test]
    fn monotonic_in_size_and_within_bounds() {
        let policy = TimeoutPolicy::default();
        for is_pid in [false, true] {
            let mut previous = Duration::ZERO;
            for size in sizes() {
                let t = estimate_timeout(&policy, size, is_pid).timeout;
                assert!(t >= previous, "not monotonic at {size}");
                assert!(t >= policy.min && t <= policy.max, "{t:?} out of bounds");
                previous = t;
            }
        }
    }

    #[test]
    fn huge_files_clamped_to_max() {
        let policy = TimeoutPolicy::default();
        let est = estimate_timeout(&policy, 10_000 * MB, false);
        assert_eq!(est.timeout, policy.max);
        assert!(est.raw_secs > policy.max.as_secs_f64());
    }

    #[test]
    fn empty_generic_file_clamped_to_min() {
        let mut policy = TimeoutPolicy::default();
        policy.min = Duration::from_secs(45);
        let est = estimate_timeout(&policy, 0, false);
        assert_eq!(est.timeout, Duration::from_secs(45));
    }

    #[test]
    fn estimate_serializes() {
        let est = estimate_timeout(&TimeoutPolicy::default(), MB, true);
        let json = serde_json::to_string(&est).unwrap();
        assert!(json.contains("\"is_pid\":true"));
        assert!(json.contains("\"raw_secs\""));
    }
}
