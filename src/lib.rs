// Core modules
pub mod analysis;
pub mod config;
pub mod config_file;
pub mod dependencies;
pub mod error;
pub mod keep_range;
pub mod pipeline;
pub mod plan;
pub mod progress;
pub mod service;
pub mod transcode;
pub mod video;
pub mod workspace;

// Re-export commonly used types
pub use analysis::AnalysisCoordinator;
pub use config::{Config, ConfigBuilder};
pub use config_file::{ConfigFile, ProfileConfig};
pub use error::{RedactError, Result, Stage};
pub use keep_range::{invert, BufferMode, KeepRange};
pub use pipeline::{run, RunReport};
pub use plan::{SegmentPlan, SegmentTask};
pub use progress::{ProgressObserver, ProgressOperation};
pub use service::{
    AnalysisJob, AnalysisResults, AnalysisService, CheckOptions, JobStatus,
    ObjectionableInstance, VideoboxClient,
};
pub use transcode::{FfmpegRunner, ToolRunner, TranscodeOrchestrator};
pub use workspace::Workspace;
