use std::path::{Path, PathBuf};

use crate::variant::{CompileOptions, LanguageVariant};

pub const DEFAULT_OUT_DIR: &str = "compiled-dicts";
pub const DEFAULT_VERSION_FILE: &str = "version.py";
pub const DEFAULT_MIN_WORD_FREQ: u32 = 1;
pub const DEFAULT_PACKAGE_AUTHOR: &str = "Mikhail Korobov";
pub const DEFAULT_PACKAGE_AUTHOR_EMAIL: &str = "kmike84@gmail.com";

/// A dump the pipeline consumes: where it comes from and where it is materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub url: Option<String>,
    pub local_path: PathBuf,
}

/// Everything one pipeline invocation needs. Built once from the command line
/// and never changed afterwards.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub variant: &'static LanguageVariant,
    pub work_root: PathBuf,
    pub out_dir: PathBuf,
    pub version_file: PathBuf,
    pub dictionary: SourceFile,
    pub corpus: Option<SourceFile>,
    /// Re-fetch sources even when a local copy exists.
    pub force_download: bool,
    /// Keep transient XML dumps after a successful run.
    pub keep_sources: bool,
    pub skip_compile: bool,
    pub skip_probability: bool,
    /// Replace a non-empty output directory instead of refusing.
    pub clear_output: bool,
    /// Cleanup also removes the compiled output directory.
    pub remove_output_on_cleanup: bool,
    pub source_name: String,
    pub compile_options: CompileOptions,
    pub min_word_freq: u32,
    pub package_author: String,
    pub package_author_email: String,
}

impl BuildConfig {
    /// Defaults for running the full update of `variant` inside `work_root`.
    pub fn for_variant(variant: &'static LanguageVariant, work_root: &Path) -> Self {
        Self {
            variant,
            work_root: work_root.to_path_buf(),
            out_dir: work_root.join(DEFAULT_OUT_DIR),
            version_file: work_root.join(DEFAULT_VERSION_FILE),
            dictionary: SourceFile {
                url: Some(variant.dict_url.to_string()),
                local_path: work_root.join(variant.dict_xml_name),
            },
            corpus: variant.corpus.map(|corpus| SourceFile {
                url: Some(corpus.url.to_string()),
                local_path: work_root.join(corpus.xml_name),
            }),
            force_download: true,
            keep_sources: false,
            skip_compile: false,
            skip_probability: false,
            clear_output: true,
            remove_output_on_cleanup: false,
            source_name: variant.source_name.to_string(),
            compile_options: variant.compile_options(),
            min_word_freq: DEFAULT_MIN_WORD_FREQ,
            package_author: DEFAULT_PACKAGE_AUTHOR.to_string(),
            package_author_email: DEFAULT_PACKAGE_AUTHOR_EMAIL.to_string(),
        }
    }

    /// Sources the download stage has to materialize.
    pub fn required_sources(&self) -> Vec<(&'static str, &SourceFile)> {
        let mut sources = vec![("dictionary", &self.dictionary)];
        if !self.skip_probability {
            if let Some(corpus) = &self.corpus {
                sources.push(("corpus", corpus));
            }
        }
        sources
    }

    pub fn transient_files(&self) -> Vec<&Path> {
        let mut files = vec![self.dictionary.local_path.as_path()];
        if let Some(corpus) = &self.corpus {
            files.push(corpus.local_path.as_path());
        }
        files
    }
}
