use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::{debug, info};

use crate::error::{PipelineError, Result};

use super::{CompileRequest, DictionaryCompiler, ProbabilityEstimator};

pub const DEFAULT_DICT_TOOL: &str = "morph-dict-tool";

const STDERR_TAIL_LINES: usize = 20;

/// Compiler and estimator backed by an external dictionary tool:
///
/// ```text
/// <tool> compile <dict.xml> <out-dir> --source-name NAME --min-ending-freq N
///        --min-paradigm-popularity N --max-suffix-length N [--paradigm-prefix P]...
/// <tool> estimate <corpus.xml> <out-dir> --min-word-freq N
/// ```
#[derive(Debug, Clone)]
pub struct CommandToolchain {
    program: PathBuf,
}

impl CommandToolchain {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn compile_command(&self, request: &CompileRequest<'_>) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("compile")
            .arg(request.dict_xml)
            .arg(request.out_dir)
            .arg("--source-name")
            .arg(request.source_name)
            .arg("--min-ending-freq")
            .arg(request.options.min_ending_freq.to_string())
            .arg("--min-paradigm-popularity")
            .arg(request.options.min_paradigm_popularity.to_string())
            .arg("--max-suffix-length")
            .arg(request.options.max_suffix_length.to_string());
        for prefix in &request.options.paradigm_prefixes {
            command.arg("--paradigm-prefix").arg(prefix);
        }
        command
    }

    pub fn estimate_command(&self, corpus_xml: &Path, out_dir: &Path, min_word_freq: u32) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("estimate")
            .arg(corpus_xml)
            .arg(out_dir)
            .arg("--min-word-freq")
            .arg(min_word_freq.to_string());
        command
    }

    fn execute(&self, mut command: Command) -> std::result::Result<(), String> {
        let output = command
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| format!("failed to execute {}: {err}", self.program.display()))?;

        forward_stderr(&output);

        if !output.status.success() {
            return Err(format!(
                "{} returned {}: {}",
                self.program.display(),
                output.status,
                stderr_tail(&output)
            ));
        }

        Ok(())
    }
}

impl DictionaryCompiler for CommandToolchain {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<()> {
        info!(
            program = %self.program.display(),
            dict_xml = %request.dict_xml.display(),
            out_dir = %request.out_dir.display(),
            "compiling dictionary"
        );
        self.execute(self.compile_command(request))
            .map_err(|message| PipelineError::CompilationFailure { message })
    }
}

impl ProbabilityEstimator for CommandToolchain {
    fn estimate(&self, corpus_xml: &Path, out_dir: &Path, min_word_freq: u32) -> Result<()> {
        info!(
            program = %self.program.display(),
            corpus_xml = %corpus_xml.display(),
            min_word_freq,
            "estimating P(tag|word)"
        );
        self.execute(self.estimate_command(corpus_xml, out_dir, min_word_freq))
            .map_err(|message| PipelineError::ProbabilityEstimationFailure { message })
    }
}

fn forward_stderr(output: &Output) {
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        let line = line.trim_end();
        if !line.is_empty() {
            debug!(line, "tool output");
        }
    }
}

fn stderr_tail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    let tail = lines[start..].join("\n");
    if tail.is_empty() {
        "no stderr output".to_string()
    } else {
        tail
    }
}
