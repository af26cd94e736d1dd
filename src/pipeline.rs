//! One end-to-end redaction run.
//!
//! The workspace is opened before anything touches the service and is
//! closed on every path out of [`run`], whatever the outcome.

use log::info;
use std::path::{Path, PathBuf};

use crate::analysis::AnalysisCoordinator;
use crate::config::Config;
use crate::error::{RedactError, Result, Stage, StageContext};
use crate::keep_range::{invert, KeepRange};
use crate::plan::SegmentPlan;
use crate::progress::{ProgressObserver, ProgressOperation};
use crate::service::AnalysisService;
use crate::transcode::{ToolRunner, TranscodeOrchestrator};
use crate::video::{dotted_extension, validate_video_file};
use crate::workspace::Workspace;

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub output_file: PathBuf,
    pub keep_ranges: Vec<KeepRange>,
    pub segments: usize,
    pub objectionable_instances: usize,
}

/// Redact `config.input_file`, writing the result to `config.output_path()`
pub async fn run(
    config: &Config,
    service: &dyn AnalysisService,
    runner: &dyn ToolRunner,
    progress: &ProgressOperation,
) -> Result<RunReport> {
    validate_video_file(&config.input_file)
        .map_err(RedactError::from)
        .stage(Stage::Validate)?;

    let hint = config
        .input_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut workspace = Workspace::open(&config.workspace_root, &hint).stage(Stage::Workspace)?;

    let result = redact(config, service, runner, progress, workspace.path()).await;
    workspace.close();
    result
}

async fn redact(
    config: &Config,
    service: &dyn AnalysisService,
    runner: &dyn ToolRunner,
    progress: &ProgressOperation,
    workspace: &Path,
) -> Result<RunReport> {
    let coordinator = AnalysisCoordinator::new(service)
        .with_poll_interval(config.poll_interval)
        .with_timeout(config.analysis_timeout);

    let job = progress
        .with_spinner(
            "Uploading video for analysis",
            coordinator.submit(&config.input_file, &config.check_options()),
        )
        .await
        .stage(Stage::Submit)?;

    let bar = progress.analysis_observer("Analyzing video");
    let observer = bar.as_ref().map(|b| b as &dyn ProgressObserver);
    let waited = coordinator.await_completion(&job.id, observer).await;
    if let Some(bar) = &bar {
        match waited {
            Ok(_) => bar.finish("✓ Analysis complete"),
            Err(_) => bar.abandon(),
        }
    }
    let results = waited.stage(Stage::Wait)?;
    coordinator.discard(&job.id).await;

    let keep_ranges = invert(
        &results.instances,
        results.total_duration_ms,
        config.buffer_ms,
        config.buffer_mode,
    )
    .stage(Stage::KeepRanges)?;
    info!(
        "Keeping {} range(s) after removing {} instance(s)",
        keep_ranges.len(),
        results.instances.len()
    );

    let plan = SegmentPlan::build(&keep_ranges, &dotted_extension(&config.input_file), workspace)
        .stage(Stage::Plan)?;

    let orchestrator = TranscodeOrchestrator::new(runner);
    progress
        .with_spinner(
            &format!("Extracting {} segment(s)", plan.tasks.len()),
            orchestrator.extract(&config.input_file, &plan),
        )
        .await
        .stage(Stage::Extract)?;

    let output_file = config.output_path();
    progress
        .with_spinner(
            "Stitching segments",
            orchestrator.concatenate(&plan, &output_file),
        )
        .await
        .stage(Stage::Concatenate)?;

    Ok(RunReport {
        output_file,
        keep_ranges,
        segments: plan.tasks.len(),
        objectionable_instances: results.instances.len(),
    })
}
