use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::external::{Invocation, ModelOption, ModelRunner};
use crate::types::IMG_FORMATS;

/// Convert Pascal VOC pedestrian annotations to a COCO dataset and drive DINO runs.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Convert every split to COCO JSON and lay out the dataset for DINO
    Convert(ConvertArgs),
    /// Draw the annotated boxes of one split onto copies of its images
    Preview(PreviewArgs),
    /// Evaluate a checkpoint with the external DINO entry point
    Eval(EvalArgs),
    /// Fine-tune a pretrained checkpoint with the external DINO entry point
    Finetune(FinetuneArgs),
}

/// Arguments of the `convert` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Dataset root holding one directory of images + VOC XML per split
    #[arg(short = 'd', long = "dataset_dir")]
    pub dataset_dir: PathBuf,

    /// Where `annotations/` and the split image directories are written (defaults to dataset_dir)
    #[arg(short = 'o', long = "output_dir")]
    pub output_dir: Option<PathBuf>,

    /// Split mapping SOURCE=TARGET, e.g. valid=val2017
    #[arg(
        long = "split",
        value_parser = parse_split,
        default_values = ["train=train2017", "valid=val2017"]
    )]
    pub splits: Vec<SplitSpec>,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Base `info.description`; validation/test splits get a suffix
    #[arg(long = "description", default_value = "Pedestrian Dataset")]
    pub description: String,

    /// Only write the annotation files, do not copy images
    #[arg(long = "skip_images")]
    pub skip_images: bool,
}

/// Arguments of the `preview` subcommand.
#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    /// Directory of images + VOC XML for one split
    #[arg(short = 'd', long = "split_dir")]
    pub split_dir: PathBuf,

    /// Directory the annotated copies are written to
    #[arg(short = 'o', long = "output_dir")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Which files of a split count as images, and in which order they get ids.
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Image file extensions to pick up
    #[arg(
        long = "image_ext",
        value_delimiter = ',',
        default_value = "png",
        value_parser = validate_extension
    )]
    pub image_ext: Vec<String>,

    /// Order in which images receive their ids
    #[arg(long = "order", value_enum, default_value_t = ImageOrder::Lexicographic)]
    pub order: ImageOrder,
}

/// Options shared by every external model run.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Checkout of the DINO repository, used as working directory
    #[arg(long = "repo_dir", default_value = ".")]
    pub repo_dir: PathBuf,

    /// Python interpreter
    #[arg(long = "python", default_value = "python")]
    pub python: String,

    /// Entry point script, relative to repo_dir
    #[arg(long = "entry_point", default_value = "main.py")]
    pub entry_point: PathBuf,

    /// Model config file
    #[arg(short = 'c', long = "config", default_value = "config/DINO/DINO_4scale.py")]
    pub config_path: PathBuf,

    /// Dataset root produced by `convert`
    #[arg(long = "coco_path")]
    pub coco_path: PathBuf,

    /// Config overrides as KEY=VALUE
    #[arg(
        long = "options",
        num_args = 1..,
        value_parser = parse_model_option,
        default_values = crate::external::DEFAULT_MODEL_OPTIONS.iter().copied()
    )]
    pub options: Vec<ModelOption>,
}

/// Arguments of the `eval` subcommand.
#[derive(Args, Debug, Clone)]
pub struct EvalArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Checkpoint to evaluate
    #[arg(long = "resume")]
    pub checkpoint: PathBuf,

    /// Output directory for logs and results
    #[arg(long = "output_dir", default_value = "logs/DINO/R50-MS4")]
    pub output_dir: PathBuf,

    /// Ask the model to save its raw predictions
    #[arg(long = "save_results")]
    pub save_results: bool,
}

/// Arguments of the `finetune` subcommand.
#[derive(Args, Debug, Clone)]
pub struct FinetuneArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Pretrained checkpoint to start from
    #[arg(long = "pretrain_model_path")]
    pub pretrained: PathBuf,

    /// Output directory for logs and checkpoints
    #[arg(long = "output_dir", default_value = "logs/DINO/fine_tune_R50-MS4")]
    pub output_dir: PathBuf,

    /// Checkpoint parameters not loaded from the pretrained model
    #[arg(
        long = "finetune_ignore",
        num_args = 1..,
        default_values = crate::external::DEFAULT_FINETUNE_IGNORE.iter().copied()
    )]
    pub finetune_ignore: Vec<String>,
}

// Order in which image files are assigned ids
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum ImageOrder {
    /// Raw directory listing order; platform dependent
    Listing,
    /// Sorted by file name
    #[default]
    Lexicographic,
    /// Sorted by the last number embedded in the file stem
    Numeric,
}

/// A dataset split: the input directory name and the name it gets in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSpec {
    pub source: String,
    pub target: String,
}

impl SplitSpec {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// `info.description` for this split.
    pub fn description(&self, base: &str) -> String {
        if self.target.starts_with("val") {
            format!("{} - Val", base)
        } else if self.target.starts_with("test") {
            format!("{} - Test", base)
        } else {
            base.to_string()
        }
    }

    /// File name of the split's COCO annotation file.
    pub fn annotation_file_name(&self) -> String {
        format!("instances_{}.json", self.target)
    }
}

impl fmt::Display for SplitSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.source, self.target)
    }
}

impl FromStr for SplitSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, target) = s
            .split_once('=')
            .ok_or_else(|| format!("split must look like SOURCE=TARGET, got '{}'", s))?;
        for name in [source, target] {
            if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(format!("invalid split directory name '{}'", name));
            }
        }
        Ok(SplitSpec::new(source, target))
    }
}

/// Image selection handed to the converter and the preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSelection {
    pub extensions: Vec<String>,
    pub order: ImageOrder,
}

impl Default for ImageSelection {
    fn default() -> Self {
        Self {
            extensions: vec!["png".to_string()],
            order: ImageOrder::default(),
        }
    }
}

impl ImageSelection {
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

/// Settings for a whole-dataset conversion.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub dataset_dir: PathBuf,
    pub output_dir: PathBuf,
    pub splits: Vec<SplitSpec>,
    pub selection: ImageSelection,
    pub description: String,
    pub copy_images: bool,
}

/// Settings for drawing the boxes of one split.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    pub split_dir: PathBuf,
    pub output_dir: PathBuf,
    pub selection: ImageSelection,
}

impl SelectionArgs {
    pub fn to_selection(&self) -> ImageSelection {
        ImageSelection {
            extensions: self.image_ext.clone(),
            order: self.order,
        }
    }
}

impl ConvertArgs {
    pub fn to_convert_config(&self) -> ConvertConfig {
        ConvertConfig {
            dataset_dir: self.dataset_dir.clone(),
            output_dir: self
                .output_dir
                .clone()
                .unwrap_or_else(|| self.dataset_dir.clone()),
            splits: self.splits.clone(),
            selection: self.selection.to_selection(),
            description: self.description.clone(),
            copy_images: !self.skip_images,
        }
    }
}

impl PreviewArgs {
    pub fn to_preview_config(&self) -> PreviewConfig {
        PreviewConfig {
            split_dir: self.split_dir.clone(),
            output_dir: self.output_dir.clone(),
            selection: self.selection.to_selection(),
        }
    }
}

impl ModelArgs {
    pub fn to_runner(&self) -> ModelRunner {
        ModelRunner {
            python: self.python.clone(),
            repo_dir: self.repo_dir.clone(),
            entry_point: self.entry_point.clone(),
        }
    }
}

impl EvalArgs {
    pub fn to_invocation(&self) -> Invocation {
        Invocation::Evaluate {
            config_path: self.model.config_path.clone(),
            coco_path: self.model.coco_path.clone(),
            checkpoint: self.checkpoint.clone(),
            output_dir: self.output_dir.clone(),
            save_results: self.save_results,
            options: self.model.options.clone(),
        }
    }
}

impl FinetuneArgs {
    pub fn to_invocation(&self) -> Invocation {
        Invocation::Finetune {
            config_path: self.model.config_path.clone(),
            coco_path: self.model.coco_path.clone(),
            pretrained: self.pretrained.clone(),
            output_dir: self.output_dir.clone(),
            finetune_ignore: self.finetune_ignore.clone(),
            options: self.model.options.clone(),
        }
    }
}

pub fn parse_split(s: &str) -> Result<SplitSpec, String> {
    s.parse()
}

pub fn parse_model_option(s: &str) -> Result<ModelOption, String> {
    s.parse()
}

// Validate that the extension is a supported image format
pub fn validate_extension(s: &str) -> Result<String, String> {
    let ext = s.trim().trim_start_matches('.').to_lowercase();
    if IMG_FORMATS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(format!(
            "unsupported image extension '{}', expected one of: {}",
            s,
            IMG_FORMATS.join(", ")
        ))
    }
}
