use std::fmt;
use std::time::Duration;

/// Pipeline stage that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Workspace,
    Submit,
    Wait,
    KeepRanges,
    Plan,
    Extract,
    Concatenate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validate => "validate input",
            Stage::Workspace => "create workspace",
            Stage::Submit => "submit video",
            Stage::Wait => "wait for analysis",
            Stage::KeepRanges => "compute keep ranges",
            Stage::Plan => "build segment plan",
            Stage::Extract => "extract segments",
            Stage::Concatenate => "concatenate segments",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Custom error types for videoredact
#[derive(Debug)]
pub enum RedactError {
    /// Bad configuration or unusable input data
    Validation { field: String, message: String },

    /// Transport or protocol failure talking to the analysis service
    RemoteService { message: String },

    /// The analysis service reported the job as failed
    AnalysisFailed { message: String },

    /// The transcoding tool exited unsuccessfully
    Transcode { message: String, tool_output: String },

    /// File system related errors
    FileSystem { source: std::io::Error, path: std::path::PathBuf },

    /// A configured deadline expired
    Timeout { operation: String, after: Duration },

    /// Missing external dependency
    MissingDependency { name: String, suggestion: String },

    /// Any of the above, tagged with the stage that produced it
    Stage { stage: Stage, source: Box<RedactError> },
}

impl RedactError {
    /// Strip stage wrappers and return the underlying error
    pub fn root(&self) -> &RedactError {
        match self {
            RedactError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Outermost stage this error was tagged with, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RedactError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl fmt::Display for RedactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedactError::Validation { field, message } => {
                write!(f, "Validation error in '{}': {}", field, message)
            }
            RedactError::RemoteService { message } => {
                write!(f, "Analysis service error: {}", message)
            }
            RedactError::AnalysisFailed { message } => {
                write!(f, "Analysis failed: {}", message)
            }
            RedactError::Transcode { message, tool_output } => {
                write!(f, "Transcode error: {}", message)?;
                if !tool_output.is_empty() {
                    write!(f, "\nTool output:\n{}", tool_output)?;
                }
                Ok(())
            }
            RedactError::FileSystem { source, path } => {
                write!(f, "File system error for '{}': {}", path.display(), source)
            }
            RedactError::Timeout { operation, after } => {
                write!(f, "Timed out after {:?}: {}", after, operation)
            }
            RedactError::MissingDependency { name, suggestion } => {
                write!(f, "Missing dependency '{}': {}", name, suggestion)
            }
            RedactError::Stage { stage, source } => {
                write!(f, "{}: {}", stage, source)
            }
        }
    }
}

impl std::error::Error for RedactError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RedactError::FileSystem { source, .. } => Some(source),
            RedactError::Stage { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias for videoredact operations
pub type Result<T> = std::result::Result<T, RedactError>;

pub fn validation_error(field: impl Into<String>, message: impl Into<String>) -> RedactError {
    RedactError::Validation {
        field: field.into(),
        message: message.into(),
    }
}

pub fn remote_error(message: impl Into<String>) -> RedactError {
    RedactError::RemoteService {
        message: message.into(),
    }
}

pub fn transcode_error(message: impl Into<String>, tool_output: impl Into<String>) -> RedactError {
    RedactError::Transcode {
        message: message.into(),
        tool_output: tool_output.into(),
    }
}

pub fn fs_error(source: std::io::Error, path: std::path::PathBuf) -> RedactError {
    RedactError::FileSystem { source, path }
}

pub fn timeout_error(operation: impl Into<String>, after: Duration) -> RedactError {
    RedactError::Timeout {
        operation: operation.into(),
        after,
    }
}

/// Tag errors with the pipeline stage they came from
pub trait StageContext<T> {
    fn stage(self, stage: Stage) -> Result<T>;
}

impl<T> StageContext<T> for Result<T> {
    fn stage(self, stage: Stage) -> Result<T> {
        self.map_err(|e| RedactError::Stage {
            stage,
            source: Box::new(e),
        })
    }
}

/// Attach a path to io errors
pub trait IoContext<T> {
    fn with_path(self, path: impl Into<std::path::PathBuf>) -> Result<T>;
}

impl<T> IoContext<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: impl Into<std::path::PathBuf>) -> Result<T> {
        self.map_err(|e| fs_error(e, path.into()))
    }
}

impl From<reqwest::Error> for RedactError {
    fn from(err: reqwest::Error) -> Self {
        remote_error(err.to_string())
    }
}

impl From<anyhow::Error> for RedactError {
    fn from(err: anyhow::Error) -> Self {
        RedactError::Validation {
            field: "input".to_string(),
            message: format!("{:#}", err),
        }
    }
}
