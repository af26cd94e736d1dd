use async_trait::async_trait;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{timeout_error, transcode_error, IoContext, Result};
use crate::plan::SegmentPlan;

/// Exit state and combined stdout/stderr of one tool run
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub success: bool,
    pub status: Option<i32>,
    pub combined: String,
}

/// Runs the external transcoding tool with the given arguments
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, args: &[String]) -> Result<ToolOutput>;
}

/// [`ToolRunner`] that spawns an ffmpeg binary
pub struct FfmpegRunner {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill the tool if a single invocation runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl ToolRunner for FfmpegRunner {
    async fn run(&self, args: &[String]) -> Result<ToolOutput> {
        debug!("Running {:?} {}", self.program, args.join(" "));

        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_path(self.program.clone())?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| timeout_error(format!("{:?}", self.program), limit))?,
            None => child.wait_with_output().await,
        }
        .with_path(self.program.clone())?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ToolOutput {
            success: output.status.success(),
            status: output.status.code(),
            combined,
        })
    }
}

/// Arguments that cut every planned segment out of `source` in one run
pub fn extraction_args(source: &Path, plan: &SegmentPlan) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-i".to_string(),
        source.to_string_lossy().into_owned(),
    ];
    for task in &plan.tasks {
        args.extend([
            "-ss".to_string(),
            task.trim.start_secs.to_string(),
            "-t".to_string(),
            task.trim.duration_secs.to_string(),
            task.output_path.to_string_lossy().into_owned(),
        ]);
    }
    args
}

/// Arguments that stream-copy the manifest's segments into `output`
pub fn concat_args(manifest: &Path, output: &Path) -> Vec<String> {
    [
        "-y", "-f", "concat", "-safe", "0", "-i",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain([
        manifest.to_string_lossy().into_owned(),
        "-c".to_string(),
        "copy".to_string(),
        output.to_string_lossy().into_owned(),
    ])
    .collect()
}

/// Executes a [`SegmentPlan`] in two strictly sequential tool runs
pub struct TranscodeOrchestrator<'a> {
    runner: &'a dyn ToolRunner,
}

impl<'a> TranscodeOrchestrator<'a> {
    pub fn new(runner: &'a dyn ToolRunner) -> Self {
        Self { runner }
    }

    /// Extract every segment of `plan` from `source` into the workspace
    pub async fn extract(&self, source: &Path, plan: &SegmentPlan) -> Result<()> {
        info!("Breaking video into {} segment(s)", plan.tasks.len());
        let args = extraction_args(source, plan);
        self.invoke("segment extraction", &args).await
    }

    /// Write the manifest and join the extracted segments into `output`
    pub async fn concatenate(&self, plan: &SegmentPlan, output: &Path) -> Result<()> {
        info!("Stitching segments into {:?}", output);
        plan.write_manifest().await?;
        let args = concat_args(&plan.manifest_path, output);
        self.invoke("concatenation", &args).await
    }

    async fn invoke(&self, phase: &str, args: &[String]) -> Result<()> {
        let output = self.runner.run(args).await?;
        if !output.success {
            let status = output
                .status
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(transcode_error(
                format!("{} failed (exit status {})", phase, status),
                output.combined,
            ));
        }
        Ok(())
    }
}
