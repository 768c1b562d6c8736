use anyhow::Result;

use crate::cli::UpdateArgs;
use crate::error::Stage;
use crate::pipeline::BuildConfig;
use crate::variant::{self, LanguageVariant};

use super::{Toolbox, execute, pipeline_config};

pub fn run(args: UpdateArgs) -> Result<()> {
    let variant = variant::resolve(&args.lang)?;
    let config = update_config(variant, &args);
    let toolbox = Toolbox::from_pipeline_args(&args.pipeline)?;

    execute(config, &toolbox, &update_stages(&args))?;
    Ok(())
}

fn update_config(variant: &'static LanguageVariant, args: &UpdateArgs) -> BuildConfig {
    let mut config = pipeline_config(variant, &args.pipeline);
    config.force_download = !args.no_download;
    config.keep_sources = args.no_unlink;
    config.skip_compile = args.no_dict;
    config.skip_probability = args.no_prob;
    config.clear_output = true;
    config.remove_output_on_cleanup = false;
    config
}

fn update_stages(args: &UpdateArgs) -> Vec<Stage> {
    Stage::ALL
        .into_iter()
        .filter(|stage| !(args.no_package && *stage == Stage::Package))
        .collect()
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::variant::RUSSIAN;

    fn parse(argv: &[&str]) -> UpdateArgs {
        let cli = Cli::try_parse_from(argv).expect("parse");
        match cli.command {
            Commands::Update(args) => args,
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn flags_map_onto_config() {
        let args = parse(&["dictbuild", "update", "--no-download", "--no-unlink", "--no-dict"]);
        let config = update_config(&RUSSIAN, &args);

        assert!(!config.force_download);
        assert!(config.keep_sources);
        assert!(config.skip_compile);
        assert!(!config.skip_probability);
        assert!(config.clear_output);
        assert!(!config.remove_output_on_cleanup);
    }

    #[test]
    fn default_update_downloads_fresh_dumps() {
        let config = update_config(&RUSSIAN, &parse(&["dictbuild", "update", "ru"]));
        assert!(config.force_download);
        assert!(!config.keep_sources);
    }

    #[test]
    fn no_package_drops_only_the_package_stage() {
        let stages = update_stages(&parse(&["dictbuild", "update", "--no-package"]));
        assert_eq!(
            stages,
            vec![
                Stage::Download,
                Stage::Compile,
                Stage::EstimateProbability,
                Stage::Cleanup
            ]
        );
        assert_eq!(update_stages(&parse(&["dictbuild", "update"])).len(), 5);
    }
}
