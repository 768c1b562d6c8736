//! Staged, resumable dictionary rebuild.
//!
//! Stages always run in the order of [`Stage::ALL`]; each one can be left out
//! by the caller or skipped by the configuration. Only packaging failures let
//! the run continue (to cleanup); any other failure stops it, leaving the
//! transient dumps in place for a re-run.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{Span, error, info, info_span, warn};

use crate::error::{PipelineError, Stage, StageError};
use crate::external::{DictionaryCompiler, Packager, ProbabilityEstimator, RevisionReader};
use crate::fetch::SourceFetcher;
use crate::model::SourceDigest;

mod config;
mod stages;

pub use config::{BuildConfig, SourceFile};
pub use config::{
    DEFAULT_MIN_WORD_FREQ, DEFAULT_OUT_DIR, DEFAULT_PACKAGE_AUTHOR,
    DEFAULT_PACKAGE_AUTHOR_EMAIL, DEFAULT_VERSION_FILE,
};

/// The external collaborators a pipeline drives.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub fetcher: &'a dyn SourceFetcher,
    pub compiler: &'a dyn DictionaryCompiler,
    pub estimator: &'a dyn ProbabilityEstimator,
    pub revisions: &'a dyn RevisionReader,
    pub packager: &'a dyn Packager,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageStatus {
    Completed,
    Skipped(&'static str),
}

#[derive(Debug, Default)]
pub struct PipelineReport {
    pub completed: Vec<Stage>,
    pub skipped: Vec<Stage>,
    pub version: Option<String>,
    pub artifact: Option<PathBuf>,
    pub source_digests: Vec<SourceDigest>,
    pub elapsed: Duration,
    pub failure: Option<StageError>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

pub struct Pipeline<'a> {
    config: BuildConfig,
    tools: Collaborators<'a>,
    span: Span,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: BuildConfig, tools: Collaborators<'a>, span: Span) -> Self {
        Self {
            config,
            tools,
            span,
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Runs the requested stages in their fixed order.
    pub fn run(&self, requested: &[Stage]) -> PipelineReport {
        let _pipeline = self.span.enter();
        let started = Instant::now();
        let mut report = PipelineReport::default();

        for stage in Stage::ALL {
            if !requested.contains(&stage) {
                continue;
            }

            let stage_span = info_span!("stage", name = %stage);
            let _entered = stage_span.enter();
            info!("stage started");
            let stage_started = Instant::now();

            match self.run_stage(stage, &mut report) {
                Ok(StageStatus::Completed) => {
                    info!(elapsed_ms = stage_started.elapsed().as_millis(), "stage completed");
                    report.completed.push(stage);
                }
                Ok(StageStatus::Skipped(reason)) => {
                    info!(reason, "stage skipped");
                    report.skipped.push(stage);
                }
                Err(err) => {
                    let failure = StageError {
                        stage,
                        elapsed: started.elapsed(),
                        error: err,
                    };
                    if stage == Stage::Package {
                        warn!(error = %failure, "packaging failed; compiled dictionary is kept");
                        report.failure = Some(failure);
                        continue;
                    }
                    error!(error = %failure, "stage failed; aborting");
                    report.failure = Some(failure);
                    break;
                }
            }
        }

        if report.version.is_none() && !self.aborted(&report) {
            report.version = self.resolve_version_if_compiled();
        }

        report.elapsed = started.elapsed();
        report
    }

    fn aborted(&self, report: &PipelineReport) -> bool {
        report
            .failure
            .as_ref()
            .is_some_and(|failure| failure.stage != Stage::Package)
    }

    fn run_stage(
        &self,
        stage: Stage,
        report: &mut PipelineReport,
    ) -> Result<StageStatus, PipelineError> {
        match stage {
            Stage::Download => self.download(report),
            Stage::Compile => self.compile(),
            Stage::EstimateProbability => self.estimate_probability(),
            Stage::Package => self.package(report),
            Stage::Cleanup => self.cleanup(),
        }
    }
}
