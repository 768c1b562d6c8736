//! Per-language bundles: where the dumps live, how to compile them, how to
//! version and package the result. Adding a language means adding a bundle to
//! [`VARIANTS`]; the pipeline never branches on the language itself.

use crate::error::{PipelineError, Result};

/// Prediction options handed to the dictionary compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub min_ending_freq: u32,
    pub min_paradigm_popularity: u32,
    pub max_suffix_length: u32,
    pub paradigm_prefixes: Vec<String>,
}

/// What to put in the third version component when no corpus revision exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingCorpusRevision {
    /// A fixed placeholder such as `"1"`.
    Placeholder(&'static str),
    /// A UTC build timestamp, so corpus-less rebuilds publish distinct versions.
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionPolicy {
    pub missing_corpus_revision: MissingCorpusRevision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageMetadata {
    pub lang_full: &'static str,
    pub distribution_name: &'static str,
    pub package_name: &'static str,
    pub dev_status: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusSource {
    pub url: &'static str,
    pub xml_name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageVariant {
    pub code: &'static str,
    pub dict_url: &'static str,
    pub dict_xml_name: &'static str,
    pub corpus: Option<CorpusSource>,
    pub source_name: &'static str,
    pub min_ending_freq: u32,
    pub min_paradigm_popularity: u32,
    pub max_suffix_length: u32,
    pub paradigm_prefixes: &'static [&'static str],
    pub version_policy: VersionPolicy,
    pub package: PackageMetadata,
}

impl LanguageVariant {
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            min_ending_freq: self.min_ending_freq,
            min_paradigm_popularity: self.min_paradigm_popularity,
            max_suffix_length: self.max_suffix_length,
            paradigm_prefixes: self
                .paradigm_prefixes
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
        }
    }

    pub fn has_corpus(&self) -> bool {
        self.corpus.is_some()
    }
}

pub const RUSSIAN: LanguageVariant = LanguageVariant {
    code: "ru",
    dict_url: "http://opencorpora.org/files/export/dict/dict.opcorpora.xml.bz2",
    dict_xml_name: "dict.opcorpora.xml",
    corpus: Some(CorpusSource {
        url: "http://opencorpora.org/files/export/annot/annot.opcorpora.xml.bz2",
        xml_name: "annot.corpus.xml",
    }),
    source_name: "opencorpora.org",
    min_ending_freq: 2,
    min_paradigm_popularity: 3,
    max_suffix_length: 5,
    paradigm_prefixes: &["", "по", "наи"],
    version_policy: VersionPolicy {
        missing_corpus_revision: MissingCorpusRevision::Placeholder("1"),
    },
    package: PackageMetadata {
        lang_full: "Russian",
        distribution_name: "pymorphy2-dicts-ru",
        package_name: "pymorphy2_dicts_ru",
        dev_status: "4 - Beta",
    },
};

pub const UKRAINIAN: LanguageVariant = LanguageVariant {
    code: "uk",
    dict_url: "https://github.com/dchaplinsky/LT2OpenCorpora/releases/download/2.0/dict_uk.xml.bz2",
    dict_xml_name: "dict.uk.xml",
    corpus: None,
    source_name: "LT2OpenCorpora",
    min_ending_freq: 2,
    min_paradigm_popularity: 3,
    max_suffix_length: 5,
    paradigm_prefixes: &["", "най", "якнай", "щонай"],
    version_policy: VersionPolicy {
        missing_corpus_revision: MissingCorpusRevision::Timestamp,
    },
    package: PackageMetadata {
        lang_full: "Ukrainian",
        distribution_name: "pymorphy2-dicts-uk",
        package_name: "pymorphy2_dicts_uk",
        dev_status: "3 - Alpha",
    },
};

pub static VARIANTS: &[LanguageVariant] = &[RUSSIAN, UKRAINIAN];

pub const DEFAULT_LANGUAGE: &str = "ru";

/// Looks up a variant by language code, ignoring case and surrounding space.
pub fn resolve(code: &str) -> Result<&'static LanguageVariant> {
    let wanted = code.trim();
    VARIANTS
        .iter()
        .find(|variant| variant.code.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| PipelineError::UnknownVariant {
            code: code.to_string(),
            known: VARIANTS
                .iter()
                .map(|variant| variant.code)
                .collect::<Vec<_>>()
                .join(", "),
        })
}
