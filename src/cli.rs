use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::error::Stage;
use crate::external::DEFAULT_DICT_TOOL;
use crate::fetch::DEFAULT_CHUNK_SIZE;
use crate::pipeline::{DEFAULT_MIN_WORD_FREQ, DEFAULT_PACKAGE_AUTHOR, DEFAULT_PACKAGE_AUTHOR_EMAIL};
use crate::variant::DEFAULT_LANGUAGE;

#[derive(Parser, Debug)]
#[command(
    name = "dictbuild",
    version,
    about = "Rebuilds, versions and packages morphological dictionaries from upstream XML dumps"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a local dictionary dump (and optionally a corpus) once.
    Build(BuildArgs),
    /// Run the full resumable pipeline for one language.
    Update(UpdateArgs),
    /// Run an explicit subset of pipeline stages.
    UpdateAll(UpdateAllArgs),
    /// Show the metadata and version of a compiled dictionary.
    ShowMeta(ShowMetaArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ToolArgs {
    /// External dictionary tool providing `compile` and `estimate`.
    #[arg(long, default_value = DEFAULT_DICT_TOOL)]
    pub dict_tool: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Dictionary dump in OpenCorpora XML format.
    pub dict_xml: PathBuf,

    pub out_dir: PathBuf,

    /// Annotated corpus used to estimate P(tag|word).
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Source name recorded in the metadata [default: the language's source].
    #[arg(long)]
    pub source_name: Option<String>,

    /// Replace the output directory if it is not empty.
    #[arg(long, default_value_t = false)]
    pub clear: bool,

    #[arg(long)]
    pub min_ending_freq: Option<u32>,

    #[arg(long)]
    pub min_paradigm_popularity: Option<u32>,

    #[arg(long)]
    pub max_suffix_length: Option<u32>,

    #[arg(long, default_value_t = DEFAULT_MIN_WORD_FREQ)]
    pub min_word_freq: u32,

    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    pub lang: String,

    /// Also write the version declaration to this file.
    #[arg(long)]
    pub version_file: Option<PathBuf>,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Directory holding transient dumps, the output directory and run manifests.
    #[arg(long, default_value = ".")]
    pub work_root: PathBuf,

    /// Compiled output directory [default: <work-root>/compiled-dicts].
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    #[arg(long)]
    pub dict_url: Option<String>,

    #[arg(long)]
    pub corpus_url: Option<String>,

    #[arg(long, default_value_t = DEFAULT_MIN_WORD_FREQ)]
    pub min_word_freq: u32,

    #[arg(long, default_value = "package-template")]
    pub template_dir: PathBuf,

    /// Where rendered packages go [default: <work-root>].
    #[arg(long)]
    pub dist_dir: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_PACKAGE_AUTHOR)]
    pub package_author: String,

    #[arg(long, default_value = DEFAULT_PACKAGE_AUTHOR_EMAIL)]
    pub package_author_email: String,

    #[arg(long, default_value_t = 30)]
    pub connect_timeout_secs: u64,

    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// Language to rebuild.
    #[arg(default_value = DEFAULT_LANGUAGE)]
    pub lang: String,

    /// Reuse already downloaded dumps (missing ones are still fetched).
    #[arg(long, default_value_t = false)]
    pub no_download: bool,

    /// Keep the downloaded dumps after a successful run.
    #[arg(long, default_value_t = false)]
    pub no_unlink: bool,

    /// Do not recompile the dictionary.
    #[arg(long, default_value_t = false)]
    pub no_dict: bool,

    /// Do not re-estimate tag probabilities.
    #[arg(long, default_value_t = false)]
    pub no_prob: bool,

    #[arg(long, default_value_t = false)]
    pub no_package: bool,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum StageSelector {
    Download,
    Compile,
    Package,
    Cleanup,
    All,
}

impl StageSelector {
    pub fn stages(self) -> &'static [Stage] {
        match self {
            Self::Download => &[Stage::Download],
            Self::Compile => &[Stage::Compile, Stage::EstimateProbability],
            Self::Package => &[Stage::Package],
            Self::Cleanup => &[Stage::Cleanup],
            Self::All => &[
                Stage::Download,
                Stage::Compile,
                Stage::EstimateProbability,
                Stage::Package,
            ],
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct UpdateAllArgs {
    #[arg(value_enum, required = true)]
    pub stages: Vec<StageSelector>,

    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    pub lang: String,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ShowMetaArgs {
    pub out_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    pub lang: String,
}
