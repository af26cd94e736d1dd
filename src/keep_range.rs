//! Inversion of detected objectionable intervals into the ranges to keep.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{validation_error, RedactError, Result};
use crate::service::ObjectionableInstance;

/// Default padding around each cut, in milliseconds
pub const DEFAULT_BUFFER_MS: i64 = 500;

/// Half-open `[start_ms, end_ms)` interval of the source to retain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeepRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl KeepRange {
    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}

/// Which side of a cut the buffer is applied to.
///
/// The default widens the cuts and so deliberately differs from the
/// `[s - b, start + b]` keep-range rule, which would let the buffer eat into
/// flagged content. That rule is still available as [`BufferMode::ExpandKeeps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferMode {
    /// Widen every removed interval by the buffer on both sides
    #[default]
    ExpandCuts,
    /// Extend each kept range into the neighbouring cut, as in `[s - b, start + b]`
    ExpandKeeps,
}

impl BufferMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BufferMode::ExpandCuts => "expand_cuts",
            BufferMode::ExpandKeeps => "expand_keeps",
        }
    }
}

impl fmt::Display for BufferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BufferMode {
    type Err = RedactError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "expand_cuts" => Ok(BufferMode::ExpandCuts),
            "expand_keeps" => Ok(BufferMode::ExpandKeeps),
            _ => Err(validation_error(
                "buffer_mode",
                format!("Invalid buffer mode '{}'. Valid options: expand_cuts, expand_keeps", s),
            )),
        }
    }
}

/// Compute the ranges of a `total_duration_ms` long video that survive
/// removing `instances`.
///
/// `instances` must be ordered by start time and non-overlapping (touching
/// is fine); anything else is rejected rather than re-sorted. Output ranges
/// are clamped to `[0, total_duration_ms]`, ascending, and each has a
/// positive length. Overlapping candidates are not merged.
pub fn invert(
    instances: &[ObjectionableInstance],
    total_duration_ms: i64,
    buffer_ms: i64,
    mode: BufferMode,
) -> Result<Vec<KeepRange>> {
    if total_duration_ms < 0 {
        return Err(validation_error(
            "total_duration_ms",
            format!("Video duration cannot be negative, got {}", total_duration_ms),
        ));
    }
    if buffer_ms < 0 {
        return Err(validation_error(
            "buffer_ms",
            format!("Buffer cannot be negative, got {}", buffer_ms),
        ));
    }
    verify_ordered(instances)?;

    let mut ranges = Vec::with_capacity(instances.len() + 1);
    let mut cursor: Option<i64> = None;

    for instance in instances {
        let (start, end) = match mode {
            BufferMode::ExpandCuts => (
                cursor.map_or(0, |s| s + buffer_ms),
                instance.start_ms - buffer_ms,
            ),
            BufferMode::ExpandKeeps => (
                cursor.unwrap_or(0) - buffer_ms,
                instance.start_ms + buffer_ms,
            ),
        };
        push_clamped(&mut ranges, start, end, total_duration_ms);
        cursor = Some(instance.end_ms);
    }

    let tail_start = match (mode, cursor) {
        (_, None) => 0,
        (BufferMode::ExpandCuts, Some(s)) => s + buffer_ms,
        (BufferMode::ExpandKeeps, Some(s)) => s,
    };
    push_clamped(&mut ranges, tail_start, total_duration_ms, total_duration_ms);

    Ok(ranges)
}

fn push_clamped(ranges: &mut Vec<KeepRange>, start: i64, end: i64, total: i64) {
    let start = start.max(0);
    let end = end.min(total);
    if end > start {
        ranges.push(KeepRange {
            start_ms: start,
            end_ms: end,
        });
    }
}

fn verify_ordered(instances: &[ObjectionableInstance]) -> Result<()> {
    let mut previous: Option<&ObjectionableInstance> = None;
    for (i, instance) in instances.iter().enumerate() {
        if instance.start_ms > instance.end_ms || instance.start_ms < 0 {
            return Err(validation_error(
                "instances",
                format!(
                    "Instance {} has invalid bounds {}..{}ms",
                    i, instance.start_ms, instance.end_ms
                ),
            ));
        }
        if let Some(prev) = previous {
            if instance.start_ms < prev.end_ms {
                return Err(validation_error(
                    "instances",
                    format!(
                        "Instance {} ({}..{}ms) is out of order or overlaps the previous one ({}..{}ms)",
                        i, instance.start_ms, instance.end_ms, prev.start_ms, prev.end_ms
                    ),
                ));
            }
        }
        previous = Some(instance);
    }
    Ok(())
}
