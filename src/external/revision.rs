use std::fs::File;
use std::io::Read;
use std::path::Path;

use regex::Regex;

use crate::error::{PipelineError, Result};
use crate::metadata::RevisionToken;

use super::RevisionReader;

const HEAD_BYTES: u64 = 64 * 1024;

/// Reads the `revision` attribute of the corpus dump's `<annotation>` root.
#[derive(Debug, Clone)]
pub struct XmlRevisionReader {
    pattern: Regex,
}

impl XmlRevisionReader {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(r#"<annotation\b[^>]*?\srevision\s*=\s*["']([^"']+)["']"#)
            .map_err(|err| PipelineError::ProbabilityEstimationFailure {
                message: format!("failed to compile revision pattern: {err}"),
            })?;
        Ok(Self { pattern })
    }

    fn find_revision(&self, head: &str) -> Option<RevisionToken> {
        self.pattern
            .captures(head)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().trim())
            .filter(|value| !value.is_empty())
            .map(RevisionToken::new)
    }
}

impl RevisionReader for XmlRevisionReader {
    fn read_revision(&self, corpus_xml: &Path) -> Result<RevisionToken> {
        let file = File::open(corpus_xml).map_err(|err| PipelineError::io(corpus_xml, err))?;
        let mut head = Vec::new();
        file.take(HEAD_BYTES)
            .read_to_end(&mut head)
            .map_err(|err| PipelineError::io(corpus_xml, err))?;

        self.find_revision(&String::from_utf8_lossy(&head))
            .ok_or_else(|| PipelineError::ProbabilityEstimationFailure {
                message: format!(
                    "no <annotation revision=...> found in {}",
                    corpus_xml.display()
                ),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn reads_revision_from_annotation_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("annot.corpus.xml");
        fs::write(
            &path,
            "<?xml version=\"1.0\" encoding=\"utf-8\" standalone=\"yes\"?>\n\
             <annotation version=\"0.12\" revision=\"4172888\">\n<text id=\"1\"/>\n</annotation>\n",
        )
        .expect("write");

        let reader = XmlRevisionReader::new().expect("reader");
        assert_eq!(
            reader.read_revision(&path).expect("revision"),
            RevisionToken::new("4172888")
        );
    }

    #[test]
    fn version_attribute_is_not_mistaken_for_revision() {
        let reader = XmlRevisionReader::new().expect("reader");
        assert_eq!(reader.find_revision("<annotation version=\"0.12\">"), None);
        assert_eq!(
            reader.find_revision("<annotation\n  revision='77'\n  version=\"0.12\">"),
            Some(RevisionToken::new("77"))
        );
    }

    #[test]
    fn corpus_without_revision_is_an_estimation_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("annot.corpus.xml");
        fs::write(&path, "<annotation version=\"0.12\"></annotation>").expect("write");

        let err = XmlRevisionReader::new()
            .expect("reader")
            .read_revision(&path)
            .expect_err("no revision");
        assert!(matches!(err, PipelineError::ProbabilityEstimationFailure { .. }));
    }
}
