use anyhow::{Context, Result};
use tracing::{info, info_span};

use crate::cli::BuildArgs;
use crate::error::Stage;
use crate::fetch::{DEFAULT_CHUNK_SIZE, DEFAULT_CONNECT_TIMEOUT};
use crate::pipeline::{BuildConfig, Pipeline, SourceFile};
use crate::util::parent_or_current;
use crate::variant;
use crate::version::write_version_artifact;

use super::Toolbox;

const BUILD_STAGES: [Stage; 2] = [Stage::Compile, Stage::EstimateProbability];

pub fn run(args: BuildArgs) -> Result<()> {
    let variant = variant::resolve(&args.lang)?;
    let config = build_config(variant, &args);

    let work_root = config.work_root.clone();
    let toolbox = Toolbox::new(
        &args.tools.dict_tool,
        DEFAULT_CONNECT_TIMEOUT,
        DEFAULT_CHUNK_SIZE,
        &work_root.join("package-template"),
        &work_root,
    )?;

    info!(
        dict_xml = %args.dict_xml.display(),
        out_dir = %args.out_dir.display(),
        corpus = %args.corpus.as_ref().map(|path| path.display().to_string()).unwrap_or_default(),
        lang = variant.code,
        "building dictionary"
    );

    let span = info_span!("build", lang = variant.code);
    let pipeline = Pipeline::new(config, toolbox.collaborators(), span);
    let mut report = pipeline.run(&BUILD_STAGES);

    if let Some(failure) = report.failure.take() {
        return Err(failure).context("dictionary build failed");
    }

    let version = match report.version {
        Some(version) => version,
        None => pipeline.resolve_version()?,
    };

    if let Some(version_file) = &args.version_file {
        write_version_artifact(&version, version_file)?;
        info!(path = %version_file.display(), "wrote version declaration");
    }

    info!(
        version = %version,
        "done in {:.1}s",
        report.elapsed.as_secs_f64()
    );

    Ok(())
}

fn build_config(variant: &'static variant::LanguageVariant, args: &BuildArgs) -> BuildConfig {
    let work_root = parent_or_current(&args.out_dir).to_path_buf();
    let mut config = BuildConfig::for_variant(variant, &work_root);

    config.out_dir = args.out_dir.clone();
    config.version_file = args
        .version_file
        .clone()
        .unwrap_or_else(|| work_root.join(crate::pipeline::DEFAULT_VERSION_FILE));
    config.dictionary = SourceFile {
        url: None,
        local_path: args.dict_xml.clone(),
    };
    config.corpus = args.corpus.as_ref().map(|path| SourceFile {
        url: None,
        local_path: path.clone(),
    });
    config.force_download = false;
    config.keep_sources = true;
    config.clear_output = args.clear;
    if let Some(source_name) = &args.source_name {
        config.source_name = source_name.clone();
    }
    if let Some(value) = args.min_ending_freq {
        config.compile_options.min_ending_freq = value;
    }
    if let Some(value) = args.min_paradigm_popularity {
        config.compile_options.min_paradigm_popularity = value;
    }
    if let Some(value) = args.max_suffix_length {
        config.compile_options.max_suffix_length = value;
    }
    config.min_word_freq = args.min_word_freq;

    config
}
