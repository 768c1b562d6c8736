use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures produced while rebuilding a dictionary artifact.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("output path exists: {} (pass --clear to replace it)", path.display())]
    OutputConflict { path: PathBuf },

    #[error("failed to fetch {url}: {message}")]
    FetchFailure { url: String, message: String },

    #[error("dictionary compilation failed: {message}")]
    CompilationFailure { message: String },

    #[error("tag probability estimation failed: {message}")]
    ProbabilityEstimationFailure { message: String },

    #[error("packaging failed: {message}")]
    PackagingFailure { message: String },

    #[error("dictionary metadata missing at {}: {detail}", path.display())]
    MetadataMissing { path: PathBuf, detail: String },

    #[error("dictionary metadata at {} is corrupt: {message}", path.display())]
    MetadataCorrupt { path: PathBuf, message: String },

    #[error("unknown language variant {code:?} (known: {known})")]
    UnknownVariant { code: String, known: String },

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn fetch(url: &str, message: impl fmt::Display) -> Self {
        Self::FetchFailure {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

/// Pipeline stages in their fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Download,
    Compile,
    EstimateProbability,
    Package,
    Cleanup,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Download,
        Stage::Compile,
        Stage::EstimateProbability,
        Stage::Package,
        Stage::Cleanup,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Compile => "compile",
            Self::EstimateProbability => "estimate-probability",
            Self::Package => "package",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage failure with the stage name and the wall-clock time spent so far.
#[derive(Debug, thiserror::Error)]
#[error("stage {stage} failed after {:.1}s: {error}", elapsed.as_secs_f64())]
pub struct StageError {
    pub stage: Stage,
    pub elapsed: Duration,
    #[source]
    pub error: PipelineError,
}
