use anyhow::Result;
use tracing::{info, warn};

use crate::cli::ShowMetaArgs;
use crate::metadata;
use crate::variant;
use crate::version::load_revision_triple;

pub fn run(args: ShowMetaArgs) -> Result<()> {
    let variant = variant::resolve(&args.lang)?;
    let meta_path = metadata::meta_path(&args.out_dir);
    let record = metadata::read(&meta_path)?;

    info!(path = %meta_path.display(), keys = record.len(), "loaded dictionary metadata");
    if record.is_empty() {
        warn!(path = %meta_path.display(), "metadata record is empty");
    }
    for (key, value) in record.iter() {
        info!(key, value = %value, "meta");
    }

    let triple = load_revision_triple(&args.out_dir)?;
    info!(
        format_version = %triple.format_version,
        source_revision = %triple.dictionary_revision,
        corpus_revision = %triple
            .corpus_revision
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        version = %triple.render(&variant.version_policy),
        "dictionary version"
    );

    Ok(())
}
