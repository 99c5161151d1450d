use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use voc2coco::config::{Cli, Command};
use voc2coco::overlay::preview_split;
use voc2coco::process_dataset;

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let outcome = match &cli.command {
        Command::Convert(args) => {
            let config = args.to_convert_config();
            if !config.dataset_dir.is_dir() {
                error!(
                    "The specified dataset_dir does not exist: {}",
                    config.dataset_dir.display()
                );
                return ExitCode::FAILURE;
            }
            info!("Starting VOC to COCO conversion...");
            process_dataset(&config).map(|_| ())
        }
        Command::Preview(args) => {
            info!("Drawing annotation previews...");
            preview_split(&args.to_preview_config()).map(|_| ())
        }
        Command::Eval(args) => {
            info!("Starting evaluation run...");
            args.model.to_runner().run(&args.to_invocation())
        }
        Command::Finetune(args) => {
            info!("Starting fine-tuning run...");
            args.model.to_runner().run(&args.to_invocation())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            if let Some(path) = e.path() {
                error!("Offending path: {}", path.display());
            }
            ExitCode::FAILURE
        }
    }
}
