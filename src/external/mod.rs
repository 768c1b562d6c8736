//! Narrow interfaces for the collaborators the pipeline drives but does not
//! implement: the dictionary compiler, the P(tag|word) estimator, the corpus
//! revision lookup and the packager.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::metadata::RevisionToken;
use crate::variant::CompileOptions;

mod command;
mod revision;
mod template;

pub use command::{CommandToolchain, DEFAULT_DICT_TOOL};
pub use revision::XmlRevisionReader;
pub use template::TemplatePackager;

#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub dict_xml: &'a Path,
    pub out_dir: &'a Path,
    pub source_name: &'a str,
    pub options: &'a CompileOptions,
}

/// Compiles a dictionary dump into `out_dir`, which must hold `meta.json`
/// with `format_version` and `source_revision` afterwards.
pub trait DictionaryCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<()>;
}

/// Adds conditional tag probabilities estimated from a corpus to `out_dir`.
pub trait ProbabilityEstimator {
    fn estimate(&self, corpus_xml: &Path, out_dir: &Path, min_word_freq: u32) -> Result<()>;
}

pub trait RevisionReader {
    fn read_revision(&self, corpus_xml: &Path) -> Result<RevisionToken>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageContext {
    pub distribution_name: String,
    pub package_name: String,
    pub lang: String,
    pub lang_full: String,
    pub version: String,
    pub dev_status: String,
    pub author: String,
    pub author_email: String,
}

impl PackageContext {
    pub fn lookup(&self, key: &str) -> Option<&str> {
        let value = match key {
            "distribution_name" => &self.distribution_name,
            "package_name" => &self.package_name,
            "lang" => &self.lang,
            "lang_full" => &self.lang_full,
            "version" => &self.version,
            "dev_status" => &self.dev_status,
            "author" => &self.author,
            "author_email" => &self.author_email,
            _ => return None,
        };
        Some(value.as_str())
    }
}

/// Turns a compiled output directory into a distributable unit and returns its path.
pub trait Packager {
    fn package(
        &self,
        source_dir: &Path,
        version_file: Option<&Path>,
        context: &PackageContext,
    ) -> Result<PathBuf>;
}
