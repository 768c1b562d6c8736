use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::external::{CompileRequest, PackageContext};
use crate::fetch::ProgressLog;
use crate::metadata::{self, CORPUS_REVISION_KEY};
use crate::model::SourceDigest;
use crate::util::{is_non_empty_dir, remove_path, sha256_file};
use crate::version::{load_revision_triple, write_version_artifact};

use super::{Pipeline, PipelineReport, StageStatus};

impl Pipeline<'_> {
    pub(super) fn download(&self, report: &mut PipelineReport) -> Result<StageStatus> {
        for (role, source) in self.config.required_sources() {
            let path = &source.local_path;

            if !self.config.force_download && path.is_file() {
                info!(source = role, path = %path.display(), "reusing local dump");
            } else {
                let url = source.url.as_deref().ok_or_else(|| PipelineError::FetchFailure {
                    url: String::new(),
                    message: format!("no source URL configured for {role} dump {}", path.display()),
                })?;
                info!(source = role, url, path = %path.display(), "downloading dump");
                let mut progress = ProgressLog::new(role);
                self.tools
                    .fetcher
                    .fetch(url, path, &mut |step| progress.observe(step))?;
            }

            report.source_digests.push(digest(role, path)?);
        }

        Ok(StageStatus::Completed)
    }

    pub(super) fn compile(&self) -> Result<StageStatus> {
        if self.config.skip_compile {
            return Ok(StageStatus::Skipped("dictionary compilation disabled"));
        }

        let dict_xml = &self.config.dictionary.local_path;
        if !dict_xml.is_file() {
            return Err(PipelineError::CompilationFailure {
                message: format!("dictionary dump missing: {}", dict_xml.display()),
            });
        }

        let out_dir = &self.config.out_dir;
        if out_dir.exists() {
            if is_non_empty_dir(out_dir)? && !self.config.clear_output {
                return Err(PipelineError::OutputConflict {
                    path: out_dir.clone(),
                });
            }
            info!(path = %out_dir.display(), "removing previous output");
            remove_path(out_dir)?;
        }

        let staging = staging_dir(out_dir);
        remove_path(&staging)?;

        let request = CompileRequest {
            dict_xml,
            out_dir: &staging,
            source_name: &self.config.source_name,
            options: &self.config.compile_options,
        };
        let compiled = self
            .tools
            .compiler
            .compile(&request)
            .and_then(|()| {
                load_revision_triple(&staging).map_err(|err| PipelineError::CompilationFailure {
                    message: format!("compiler output is unusable: {err}"),
                })
            });

        let triple = match compiled {
            Ok(triple) => triple,
            Err(err) => {
                if let Err(cleanup_err) = remove_path(&staging) {
                    warn!(path = %staging.display(), error = %cleanup_err, "failed to remove staging output");
                }
                return Err(err);
            }
        };

        fs::rename(&staging, out_dir).map_err(|err| PipelineError::io(out_dir, err))?;

        info!(
            path = %out_dir.display(),
            format_version = %triple.format_version,
            source_revision = %triple.dictionary_revision,
            "dictionary compiled"
        );
        Ok(StageStatus::Completed)
    }

    pub(super) fn estimate_probability(&self) -> Result<StageStatus> {
        if self.config.skip_probability {
            return Ok(StageStatus::Skipped("probability estimation disabled"));
        }
        let Some(corpus) = &self.config.corpus else {
            return Ok(StageStatus::Skipped("no corpus for this language"));
        };

        let out_dir = &self.config.out_dir;
        let meta_path = metadata::meta_path(out_dir);
        if !meta_path.is_file() {
            return Err(PipelineError::ProbabilityEstimationFailure {
                message: format!("compiled dictionary missing: {}", out_dir.display()),
            });
        }
        if !corpus.local_path.is_file() {
            return Err(PipelineError::ProbabilityEstimationFailure {
                message: format!("corpus dump missing: {}", corpus.local_path.display()),
            });
        }

        self.tools
            .estimator
            .estimate(&corpus.local_path, out_dir, self.config.min_word_freq)?;
        let revision = self.tools.revisions.read_revision(&corpus.local_path)?;

        let mut partial = Map::new();
        partial.insert(
            CORPUS_REVISION_KEY.to_string(),
            Value::String(revision.to_string()),
        );
        metadata::update(&meta_path, &partial)?;

        info!(corpus_revision = %revision, "tag probabilities added");
        Ok(StageStatus::Completed)
    }

    pub(super) fn package(&self, report: &mut PipelineReport) -> Result<StageStatus> {
        let version = self.resolve_version()?;
        write_version_artifact(&version, &self.config.version_file)?;
        report.version = Some(version.clone());

        let variant = self.config.variant;
        let context = PackageContext {
            distribution_name: variant.package.distribution_name.to_string(),
            package_name: variant.package.package_name.to_string(),
            lang: variant.code.to_string(),
            lang_full: variant.package.lang_full.to_string(),
            version,
            dev_status: variant.package.dev_status.to_string(),
            author: self.config.package_author.clone(),
            author_email: self.config.package_author_email.clone(),
        };

        let artifact = self.tools.packager.package(
            &self.config.out_dir,
            Some(&self.config.version_file),
            &context,
        )?;
        report.artifact = Some(artifact);

        Ok(StageStatus::Completed)
    }

    pub(super) fn cleanup(&self) -> Result<StageStatus> {
        let mut targets: Vec<PathBuf> = Vec::new();
        if !self.config.keep_sources {
            targets.extend(self.config.transient_files().into_iter().map(Path::to_path_buf));
        }
        if self.config.remove_output_on_cleanup {
            targets.push(self.config.out_dir.clone());
            targets.push(staging_dir(&self.config.out_dir));
        }

        if targets.is_empty() {
            return Ok(StageStatus::Skipped("sources retained"));
        }

        for target in targets {
            match remove_path(&target) {
                Ok(true) => info!(path = %target.display(), "removed"),
                Ok(false) => {}
                Err(err) => warn!(path = %target.display(), error = %err, "cleanup failed"),
            }
        }

        Ok(StageStatus::Completed)
    }

    /// Version of the compiled output under this variant's policy.
    pub fn resolve_version(&self) -> Result<String> {
        let triple = load_revision_triple(&self.config.out_dir)?;
        Ok(triple.render(&self.config.variant.version_policy))
    }

    pub(super) fn resolve_version_if_compiled(&self) -> Option<String> {
        if !metadata::meta_path(&self.config.out_dir).is_file() {
            return None;
        }
        match self.resolve_version() {
            Ok(version) => Some(version),
            Err(err) => {
                warn!(error = %err, "could not resolve dictionary version");
                None
            }
        }
    }
}

fn staging_dir(out_dir: &Path) -> PathBuf {
    let name = out_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    out_dir.with_file_name(format!("{name}.partial"))
}

fn digest(role: &str, path: &Path) -> Result<SourceDigest> {
    let bytes = fs::metadata(path)
        .map_err(|err| PipelineError::io(path, err))?
        .len();
    Ok(SourceDigest {
        role: role.to_string(),
        path: path.display().to_string(),
        bytes,
        sha256: sha256_file(path)?,
    })
}
