use std::path::PathBuf;

use engine::{
    Error,
    image_model::{AspectRatio, GenerationParams, Model},
};

const EXAMPLES: &str = indoc::indoc! {r#"
    Examples:
      nano-banana "A cyberpunk banana wearing sunglasses, 4K"
      nano-banana --edit photo.png "Add a crown"
      nano-banana -m imagen -a 16:9 -c 4 --seed 7 "A lighthouse in a storm"
      nano-banana --list -n 5
"#};

/// Generate and edit images with Nano Banana Pro and Imagen
#[derive(Debug, clap::Parser)]
#[command(name = "nano-banana", version, after_help = EXAMPLES)]
pub struct Cli {
    /// Text prompt for image generation
    pub prompt: Vec<String>,

    /// Edit an existing image (provide prompt and image path)
    #[arg(short, long, value_name = "IMAGE")]
    pub edit: Option<PathBuf>,

    /// List recent image generations
    #[arg(short, long)]
    pub list: bool,

    /// Number of recent files to show
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,

    /// Output file name, relative names are placed in the output directory
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory [default: ~/nano_banana_pro_outputs]
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Image model to use [default: from config, else gemini]
    #[arg(short, long)]
    pub model: Option<Model>,

    #[arg(short, long)]
    pub aspect_ratio: Option<AspectRatio>,

    /// Number of images to request
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=4))]
    pub count: u8,

    /// What the image should not contain
    #[arg(long)]
    pub negative_prompt: Option<String>,

    #[arg(long)]
    pub seed: Option<u32>,

    /// How closely to follow the prompt
    #[arg(long)]
    pub guidance_scale: Option<f32>,

    /// Save the API key and exit
    #[arg(long, value_name = "KEY")]
    pub set_key: Option<String>,

    /// Save the cloud project id (needed by imagen) and exit
    #[arg(long, value_name = "PROJECT_ID")]
    pub set_project: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum Action {
    SaveCredentials,
    List { limit: usize },
    Edit { image: PathBuf, prompt: String },
    Generate { prompt: String },
    /// Nothing to do, the caller prints help
    Usage,
}

impl Action {
    /// Whether the config file has to be read before running this action
    pub fn needs_config(&self) -> bool {
        !matches!(self, Action::SaveCredentials | Action::Usage)
    }
}

impl Cli {
    pub fn action(&self) -> Result<Action, Error> {
        let prompt = self.prompt.join(" ");
        let prompt = prompt.trim();

        if self.set_key.is_some() || self.set_project.is_some() {
            Ok(Action::SaveCredentials)
        } else if self.list {
            Ok(Action::List { limit: self.limit })
        } else if let Some(image) = &self.edit {
            if prompt.is_empty() {
                return Err(Error::InvalidInput(
                    "Edit mode requires a prompt and image path".into(),
                ));
            }
            Ok(Action::Edit {
                image: image.clone(),
                prompt: prompt.to_string(),
            })
        } else if !prompt.is_empty() {
            Ok(Action::Generate {
                prompt: prompt.to_string(),
            })
        } else {
            Ok(Action::Usage)
        }
    }

    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            aspect_ratio: self.aspect_ratio,
            count: self.count,
            negative_prompt: self.negative_prompt.clone(),
            seed: self.seed,
            guidance_scale: self.guidance_scale,
        }
    }
}
