use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, info_span};

use crate::cli::PipelineArgs;
use crate::error::Stage;
use crate::external::{CommandToolchain, TemplatePackager, XmlRevisionReader};
use crate::fetch::StreamingFetcher;
use crate::model::{RunPaths, UpdateRunManifest};
use crate::pipeline::{BuildConfig, Collaborators, Pipeline, PipelineReport};
use crate::util::{now_utc_string, utc_compact_string, write_json_pretty};
use crate::variant::LanguageVariant;

pub mod build;
pub mod show_meta;
pub mod update;
pub mod update_all;

const RUN_MANIFEST_NAME: &str = "update_run.json";

/// Default collaborators: streaming fetcher, external dictionary tool and template packager.
struct Toolbox {
    fetcher: StreamingFetcher,
    toolchain: CommandToolchain,
    revisions: XmlRevisionReader,
    packager: TemplatePackager,
}

impl Toolbox {
    fn new(
        dict_tool: &Path,
        connect_timeout: Duration,
        chunk_size: usize,
        template_dir: &Path,
        dist_dir: &Path,
    ) -> Result<Self> {
        Ok(Self {
            fetcher: StreamingFetcher::new(connect_timeout, chunk_size),
            toolchain: CommandToolchain::new(dict_tool),
            revisions: XmlRevisionReader::new()?,
            packager: TemplatePackager::new(template_dir, dist_dir),
        })
    }

    fn from_pipeline_args(args: &PipelineArgs) -> Result<Self> {
        let dist_dir = args
            .dist_dir
            .clone()
            .unwrap_or_else(|| args.work_root.clone());
        Self::new(
            &args.tools.dict_tool,
            Duration::from_secs(args.connect_timeout_secs),
            args.chunk_size,
            &args.template_dir,
            &dist_dir,
        )
    }

    fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            fetcher: &self.fetcher,
            compiler: &self.toolchain,
            estimator: &self.toolchain,
            revisions: &self.revisions,
            packager: &self.packager,
        }
    }
}

/// Pipeline configuration shared by `update` and `update-all`.
fn pipeline_config(variant: &'static LanguageVariant, args: &PipelineArgs) -> BuildConfig {
    let mut config = BuildConfig::for_variant(variant, &args.work_root);
    if let Some(out_dir) = &args.out_dir {
        config.out_dir = out_dir.clone();
    }
    if let Some(url) = &args.dict_url {
        config.dictionary.url = Some(url.clone());
    }
    if let (Some(url), Some(corpus)) = (&args.corpus_url, config.corpus.as_mut()) {
        corpus.url = Some(url.clone());
    }
    config.min_word_freq = args.min_word_freq;
    config.package_author = args.package_author.clone();
    config.package_author_email = args.package_author_email.clone();
    config
}

/// Runs `stages`, records the run manifest and turns a stage failure into an error.
fn execute(config: BuildConfig, toolbox: &Toolbox, stages: &[Stage]) -> Result<PipelineReport> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));
    let lang = config.variant.code;

    info!(lang, run_id = %run_id, work_root = %config.work_root.display(), "starting pipeline");

    let span = info_span!("pipeline", lang, run_id = %run_id);
    let pipeline = Pipeline::new(config, toolbox.collaborators(), span);
    let mut report = pipeline.run(stages);

    let manifest = run_manifest(pipeline.config(), &report, stages, run_id, started_at);
    let manifest_path = pipeline.config().work_root.join(RUN_MANIFEST_NAME);
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote run manifest");

    if let Some(failure) = report.failure.take() {
        return Err(failure).context(format!("{lang} pipeline did not complete"));
    }

    info!(
        completed = %stage_list(&report.completed).join(","),
        skipped = %stage_list(&report.skipped).join(","),
        version = %report.version.as_deref().unwrap_or("-"),
        "done in {:.1}s",
        report.elapsed.as_secs_f64()
    );

    Ok(report)
}

fn stage_list(stages: &[Stage]) -> Vec<String> {
    stages.iter().map(|stage| stage.to_string()).collect()
}

fn run_manifest(
    config: &BuildConfig,
    report: &PipelineReport,
    requested: &[Stage],
    run_id: String,
    started_at: String,
) -> UpdateRunManifest {
    let display = |path: &PathBuf| path.display().to_string();
    let mut requested = requested.to_vec();
    requested.sort();
    requested.dedup();

    UpdateRunManifest {
        manifest_version: 1,
        run_id,
        lang: config.variant.code.to_string(),
        status: if report.succeeded() { "completed" } else { "failed" }.to_string(),
        started_at,
        updated_at: now_utc_string(),
        requested_stages: stage_list(&requested),
        completed_stages: stage_list(&report.completed),
        skipped_stages: stage_list(&report.skipped),
        failed_stage: report.failure.as_ref().map(|failure| failure.stage.to_string()),
        failure_reason: report.failure.as_ref().map(|failure| failure.error.to_string()),
        elapsed_ms: report.elapsed.as_millis(),
        version: report.version.clone(),
        artifact: report.artifact.as_ref().map(display),
        command: std::env::args().collect::<Vec<_>>().join(" "),
        paths: RunPaths {
            work_root: display(&config.work_root),
            out_dir: display(&config.out_dir),
            dict_xml: display(&config.dictionary.local_path),
            corpus_xml: config.corpus.as_ref().map(|corpus| display(&corpus.local_path)),
            version_file: display(&config.version_file),
        },
        source_hashes: report.source_digests.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::{PipelineError, StageError};
    use crate::variant::RUSSIAN;

    #[test]
    fn run_manifest_records_failure_and_requested_stages() {
        let config = BuildConfig::for_variant(&RUSSIAN, Path::new("/work"));
        let report = PipelineReport {
            completed: vec![Stage::Download],
            elapsed: Duration::from_millis(1500),
            failure: Some(StageError {
                stage: Stage::Compile,
                elapsed: Duration::from_millis(1400),
                error: PipelineError::CompilationFailure {
                    message: "boom".to_string(),
                },
            }),
            ..PipelineReport::default()
        };

        let manifest = run_manifest(
            &config,
            &report,
            &[Stage::Compile, Stage::Download, Stage::Compile],
            "run-1".to_string(),
            "2026-10-16T00:00:00Z".to_string(),
        );

        assert_eq!(manifest.status, "failed");
        assert_eq!(manifest.requested_stages, vec!["download", "compile"]);
        assert_eq!(manifest.completed_stages, vec!["download"]);
        assert_eq!(manifest.failed_stage.as_deref(), Some("compile"));
        assert!(manifest.failure_reason.as_deref().unwrap_or_default().contains("boom"));
        assert_eq!(manifest.elapsed_ms, 1500);
        assert_eq!(manifest.paths.out_dir, "/work/compiled-dicts");
    }

    #[test]
    fn pipeline_config_applies_url_overrides() {
        let args = PipelineArgs {
            work_root: PathBuf::from("/work"),
            out_dir: Some(PathBuf::from("/srv/out")),
            dict_url: Some("file:///mirror/dict.xml.bz2".to_string()),
            corpus_url: Some("file:///mirror/annot.xml.bz2".to_string()),
            min_word_freq: 3,
            template_dir: PathBuf::from("package-template"),
            dist_dir: None,
            package_author: "someone".to_string(),
            package_author_email: "someone@example.org".to_string(),
            connect_timeout_secs: 30,
            chunk_size: 1024,
            tools: crate::cli::ToolArgs {
                dict_tool: PathBuf::from("tool"),
            },
        };

        let config = pipeline_config(&RUSSIAN, &args);
        assert_eq!(config.out_dir, PathBuf::from("/srv/out"));
        assert_eq!(
            config.dictionary.url.as_deref(),
            Some("file:///mirror/dict.xml.bz2")
        );
        assert_eq!(
            config.corpus.as_ref().and_then(|corpus| corpus.url.as_deref()),
            Some("file:///mirror/annot.xml.bz2")
        );
        assert_eq!(config.min_word_freq, 3);
        assert_eq!(config.package_author, "someone");
    }
}
