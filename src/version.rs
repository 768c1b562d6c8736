use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::{PipelineError, Result};
use crate::metadata::{
    self, CORPUS_REVISION_KEY, FORMAT_VERSION_KEY, RevisionToken, SOURCE_REVISION_KEY,
};
use crate::util::{utc_compact_string, write_atomic};
use crate::variant::{MissingCorpusRevision, VersionPolicy};

/// Version identity of a compiled dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionTriple {
    pub format_version: RevisionToken,
    pub dictionary_revision: RevisionToken,
    pub corpus_revision: Option<RevisionToken>,
}

impl RevisionTriple {
    pub fn render(&self, policy: &VersionPolicy) -> String {
        compute_version(
            &self.format_version,
            &self.dictionary_revision,
            self.corpus_revision.as_ref(),
            policy,
        )
    }
}

pub fn compute_version(
    format_version: &RevisionToken,
    dictionary_revision: &RevisionToken,
    corpus_revision: Option<&RevisionToken>,
    policy: &VersionPolicy,
) -> String {
    compute_version_at(
        format_version,
        dictionary_revision,
        corpus_revision,
        policy,
        Utc::now(),
    )
}

/// Always renders exactly three dot-joined components: format, dictionary, corpus.
pub fn compute_version_at(
    format_version: &RevisionToken,
    dictionary_revision: &RevisionToken,
    corpus_revision: Option<&RevisionToken>,
    policy: &VersionPolicy,
    now: DateTime<Utc>,
) -> String {
    let corpus = match (corpus_revision, policy.missing_corpus_revision) {
        (Some(revision), _) => revision.to_string(),
        (None, MissingCorpusRevision::Placeholder(placeholder)) => placeholder.to_string(),
        (None, MissingCorpusRevision::Timestamp) => utc_compact_string(now),
    };

    format!("{format_version}.{dictionary_revision}.{corpus}")
}

pub fn load_revision_triple(out_dir: &Path) -> Result<RevisionTriple> {
    let path = metadata::meta_path(out_dir);
    let record = metadata::read(&path)?;

    let required = |key: &str| {
        record
            .token(key)
            .ok_or_else(|| PipelineError::MetadataMissing {
                path: path.clone(),
                detail: format!("required key {key:?} is absent or empty"),
            })
    };

    Ok(RevisionTriple {
        format_version: required(FORMAT_VERSION_KEY)?,
        dictionary_revision: required(SOURCE_REVISION_KEY)?,
        corpus_revision: record.token(CORPUS_REVISION_KEY),
    })
}

pub fn render_version_declaration(version: &str) -> String {
    format!("__version__ = \"{version}\"\n")
}

/// Writes the version declaration consumed by packaging, replacing any previous one.
pub fn write_version_artifact(version: &str, destination: &Path) -> Result<()> {
    write_atomic(destination, render_version_declaration(version).as_bytes())
}
