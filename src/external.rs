//! Invocation of the external DINO training/evaluation entry point.
//!
//! The model is never inspected: a run is a command line, a working
//! directory and an exit status.

use log::info;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use crate::error::{Error, Result};

/// `--options` overrides passed to every run unless replaced.
pub const DEFAULT_MODEL_OPTIONS: &[&str] = &[
    "dn_scalar=100",
    "embed_init_tgt=TRUE",
    "dn_label_coef=1.0",
    "dn_bbox_coef=1.0",
    "use_ema=False",
    "dn_box_noise_scale=1.0",
];

/// Parameters ignored when loading a pretrained checkpoint for fine-tuning.
pub const DEFAULT_FINETUNE_IGNORE: &[&str] = &["label_enc.weight", "class_embed"];

/// A single `key=value` config override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOption {
    pub key: String,
    pub value: String,
}

impl FromStr for ModelOption {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.is_empty() && !value.is_empty() => Ok(Self {
                key: key.to_string(),
                value: value.to_string(),
            }),
            _ => Err(format!("option must look like KEY=VALUE, got '{}'", s)),
        }
    }
}

impl fmt::Display for ModelOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

pub fn default_model_options() -> Vec<ModelOption> {
    DEFAULT_MODEL_OPTIONS
        .iter()
        .filter_map(|option| option.parse().ok())
        .collect()
}

/// One run of the model entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Evaluate {
        config_path: PathBuf,
        coco_path: PathBuf,
        checkpoint: PathBuf,
        output_dir: PathBuf,
        save_results: bool,
        options: Vec<ModelOption>,
    },
    Finetune {
        config_path: PathBuf,
        coco_path: PathBuf,
        pretrained: PathBuf,
        output_dir: PathBuf,
        finetune_ignore: Vec<String>,
        options: Vec<ModelOption>,
    },
}

impl Invocation {
    /// Arguments following the entry point script.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match self {
            Invocation::Evaluate {
                config_path,
                coco_path,
                checkpoint,
                output_dir,
                save_results,
                options,
            } => {
                if *save_results {
                    args.push("--save_results".into());
                }
                push_common(&mut args, output_dir, config_path, coco_path);
                args.push("--eval".into());
                args.push("--resume".into());
                args.push(checkpoint.into());
                push_options(&mut args, options);
            }
            Invocation::Finetune {
                config_path,
                coco_path,
                pretrained,
                output_dir,
                finetune_ignore,
                options,
            } => {
                if !finetune_ignore.is_empty() {
                    args.push("--finetune_ignore".into());
                    args.extend(finetune_ignore.iter().map(OsString::from));
                }
                args.push("--pretrain_model_path".into());
                args.push(pretrained.into());
                push_common(&mut args, output_dir, config_path, coco_path);
                push_options(&mut args, options);
            }
        }
        args
    }
}

fn push_common(args: &mut Vec<OsString>, output_dir: &Path, config_path: &Path, coco_path: &Path) {
    args.push("--output_dir".into());
    args.push(output_dir.into());
    args.push("-c".into());
    args.push(config_path.into());
    args.push("--coco_path".into());
    args.push(coco_path.into());
}

fn push_options(args: &mut Vec<OsString>, options: &[ModelOption]) {
    if options.is_empty() {
        return;
    }
    args.push("--options".into());
    args.extend(options.iter().map(|option| OsString::from(option.to_string())));
}

/// Where and how the model entry point is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRunner {
    pub python: String,
    pub repo_dir: PathBuf,
    pub entry_point: PathBuf,
}

impl Default for ModelRunner {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            repo_dir: PathBuf::from("."),
            entry_point: PathBuf::from("main.py"),
        }
    }
}

impl ModelRunner {
    pub fn command(&self, invocation: &Invocation) -> Command {
        let mut command = Command::new(&self.python);
        command
            .arg(&self.entry_point)
            .args(invocation.to_args())
            .current_dir(&self.repo_dir);
        command
    }

    /// Run to completion with inherited stdio; any non-zero exit is an error.
    pub fn run(&self, invocation: &Invocation) -> Result<()> {
        let mut command = self.command(invocation);
        info!("Running {:?} in {}", command, self.repo_dir.display());

        let status = command
            .status()
            .map_err(|e| Error::io(Path::new(&self.python), e))?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::ExternalCommand {
                program: self.python.clone(),
                code: status.code(),
            })
        }
    }
}
