use anyhow::Result;

use crate::cli::{StageSelector, UpdateAllArgs};
use crate::error::Stage;
use crate::variant;

use super::{Toolbox, execute, pipeline_config};

pub fn run(args: UpdateAllArgs) -> Result<()> {
    let variant = variant::resolve(&args.lang)?;

    let mut config = pipeline_config(variant, &args.pipeline);
    config.force_download = true;
    config.keep_sources = false;
    config.clear_output = true;
    config.remove_output_on_cleanup = true;

    let toolbox = Toolbox::from_pipeline_args(&args.pipeline)?;
    execute(config, &toolbox, &selected_stages(&args.stages))?;
    Ok(())
}

fn selected_stages(selectors: &[StageSelector]) -> Vec<Stage> {
    let mut stages: Vec<Stage> = selectors
        .iter()
        .flat_map(|selector| selector.stages().iter().copied())
        .collect();
    stages.sort();
    stages.dedup();
    stages
}
