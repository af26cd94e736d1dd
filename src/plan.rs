use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::error::{validation_error, IoContext, Result};
use crate::keep_range::KeepRange;

/// Name of the concat manifest inside the workspace
pub const MANIFEST_FILE_NAME: &str = "segments.txt";

/// Seek/duration pair passed to the transcoder, in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trim {
    pub start_secs: i64,
    pub duration_secs: i64,
}

impl Trim {
    /// Largest whole-second window contained in `range`
    pub fn inside(range: &KeepRange) -> Self {
        let start_secs = range.start_ms.div_euclid(1000) + i64::from(range.start_ms.rem_euclid(1000) != 0);
        let end_secs = range.end_ms.div_euclid(1000);
        Self {
            start_secs,
            duration_secs: (end_secs - start_secs).max(0),
        }
    }
}

/// One segment to extract from the source
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentTask {
    pub index: usize,
    pub source_keep_range: KeepRange,
    pub trim: Trim,
    pub output_path: PathBuf,
}

impl SegmentTask {
    pub fn file_name(&self) -> String {
        self.output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Ordered extraction work plus the manifest that reassembles it
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPlan {
    pub tasks: Vec<SegmentTask>,
    pub manifest_path: PathBuf,
}

impl SegmentPlan {
    /// Build a plan for `keep_ranges` with segment files under `workspace`.
    ///
    /// Bounds are rounded inward to whole seconds (start up, end down) so a
    /// segment never reaches into the removed content around it. An empty
    /// `keep_ranges` is an error: there would be nothing to write.
    pub fn build(keep_ranges: &[KeepRange], source_extension: &str, workspace: &Path) -> Result<Self> {
        if keep_ranges.is_empty() {
            return Err(validation_error(
                "keep_ranges",
                "Nothing left to keep after removing objectionable content",
            ));
        }

        let ext = normalize_extension(source_extension);
        let tasks = keep_ranges
            .iter()
            .enumerate()
            .map(|(index, range)| {
                let trim = Trim::inside(range);
                if trim.duration_secs == 0 {
                    warn!(
                        "Keep range {}..{}ms holds no whole second and yields an empty segment",
                        range.start_ms, range.end_ms
                    );
                }
                let file_name = format!(
                    "{:04}_{}-{}{}",
                    index,
                    trim.start_secs,
                    trim.start_secs + trim.duration_secs,
                    ext
                );
                SegmentTask {
                    index,
                    source_keep_range: *range,
                    trim,
                    output_path: workspace.join(file_name),
                }
            })
            .collect::<Vec<_>>();

        debug!("Planned {} segment(s) in {:?}", tasks.len(), workspace);
        Ok(Self {
            tasks,
            manifest_path: workspace.join(MANIFEST_FILE_NAME),
        })
    }

    /// Concat demuxer listing, one `file '<name>'` line per segment in order
    pub fn manifest_contents(&self) -> String {
        self.tasks
            .iter()
            .map(|task| format!("file '{}'\n", escape_concat_path(&task.file_name())))
            .collect()
    }

    pub async fn write_manifest(&self) -> Result<()> {
        tokio::fs::write(&self.manifest_path, self.manifest_contents())
            .await
            .with_path(self.manifest_path.clone())
    }
}

fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim_start_matches('.');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(".{}", trimmed)
    }
}

/// Quote a path for the concat demuxer: `'` becomes `'\''`
fn escape_concat_path(name: &str) -> String {
    name.replace('\'', r"'\''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn range(start_ms: i64, end_ms: i64) -> KeepRange {
        KeepRange { start_ms, end_ms }
    }

    #[test]
    fn test_single_range_plan() {
        let ws = Path::new("/tmp/ws");
        let plan = SegmentPlan::build(&[range(0, 10_000)], ".mp4", ws).unwrap();

        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].trim, Trim { start_secs: 0, duration_secs: 10 });
        assert_eq!(plan.tasks[0].output_path, ws.join("0000_0-10.mp4"));
        assert_eq!(plan.manifest_path, ws.join("segments.txt"));
        assert_eq!(plan.manifest_contents(), "file '0000_0-10.mp4'\n");
    }

    #[test]
    fn test_plan_preserves_order_and_rounds_inward() {
        let ranges = [range(0, 1500), range(3500, 10_000), range(12_250, 20_999)];
        let plan = SegmentPlan::build(&ranges, "mkv", Path::new("ws")).unwrap();

        let names: Vec<_> = plan.tasks.iter().map(|t| t.file_name()).collect();
        assert_eq!(names, vec!["0000_0-1.mkv", "0001_4-10.mkv", "0002_13-20.mkv"]);
        assert_eq!(plan.tasks[1].trim, Trim { start_secs: 4, duration_secs: 6 });
        assert_eq!(plan.tasks[2].trim, Trim { start_secs: 13, duration_secs: 7 });
        for (i, task) in plan.tasks.iter().enumerate() {
            assert_eq!(task.index, i);
            assert_eq!(task.source_keep_range, ranges[i]);
        }
        assert_eq!(
            plan.manifest_contents(),
            "file '0000_0-1.mkv'\nfile '0001_4-10.mkv'\nfile '0002_13-20.mkv'\n"
        );
    }

    #[test]
    fn test_trim_stays_inside_keep_range() {
        // a floored start would reach back to 2s, inside the cut before 2.7s
        assert_eq!(Trim::inside(&range(2700, 10_000)), Trim { start_secs: 3, duration_secs: 7 });
        assert_eq!(Trim::inside(&range(2000, 9999)), Trim { start_secs: 2, duration_secs: 7 });
        assert_eq!(Trim::inside(&range(2100, 2900)), Trim { start_secs: 3, duration_secs: 0 });

        for r in [range(0, 1500), range(2700, 10_000), range(12_250, 20_999), range(999, 1001)] {
            let trim = Trim::inside(&r);
            assert!(trim.start_secs * 1000 >= r.start_ms);
            assert!((trim.start_secs + trim.duration_secs) * 1000 <= r.end_ms);
        }
    }

    #[test]
    fn test_file_names_unique() {
        // identical bounds still differ by index
        let ranges = [range(0, 900), range(100, 950), range(200, 990)];
        let plan = SegmentPlan::build(&ranges, ".mp4", Path::new("ws")).unwrap();
        let unique: HashSet<_> = plan.tasks.iter().map(|t| t.output_path.clone()).collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_empty_ranges_rejected() {
        let err = SegmentPlan::build(&[], ".mp4", Path::new("ws")).unwrap_err();
        assert!(matches!(err, crate::RedactError::Validation { .. }));
    }

    #[test]
    fn test_manifest_escapes_quotes() {
        assert_eq!(escape_concat_path("it's.mp4"), r"it'\''s.mp4");
    }

    #[tokio::test]
    async fn test_write_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let plan = SegmentPlan::build(&[range(0, 4000), range(6000, 9000)], ".mov", dir.path()).unwrap();

        plan.write_manifest().await.unwrap();

        let written = std::fs::read_to_string(dir.path().join(MANIFEST_FILE_NAME)).unwrap();
        assert_eq!(written, "file '0000_0-4.mov'\nfile '0001_6-9.mov'\n");
    }
}
