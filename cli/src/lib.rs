use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use chrono::Local;
use log::{debug, info};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use engine::{
    Error, Result,
    credentials::{self, Credentials},
    error::Category,
    history,
    image_model::{DEFAULT_LOCATION, Model, Request},
    output,
};

use crate::cli::{Action, Cli};

pub mod cli;
pub mod report;

const OUTPUT_DIR_NAME: &str = "nano_banana_pro_outputs";
const CONFIG_FILE_NAME: &str = "nano_banana.ron";

/// Optional settings, read from `nano_banana.ron` in the local config dir
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: Option<PathBuf>,
    pub model: Option<Model>,
    /// Vertex AI region for the imagen model
    pub location: Option<String>,
}

pub fn load_ron_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let src = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    ron::from_str(&src).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(dirs::config_local_dir()
        .ok_or_else(|| Error::Config("Couldn't get config dir".into()))?
        .join(CONFIG_FILE_NAME))
}

pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        Ok(Config::default())
    } else {
        debug!("Loading config from {}", path.display());
        load_ron_file(&path)
    }
}

pub fn default_output_dir() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .ok_or_else(|| Error::Config("Couldn't find home dir".into()))?
        .join(OUTPUT_DIR_NAME))
}

pub fn exit_status(category: Category) -> u8 {
    match category {
        Category::Config => 2,
        Category::Input => 3,
        Category::Upstream => 4,
        Category::Output => 5,
    }
}

pub fn exit_code(err: &Error) -> ExitCode {
    ExitCode::from(exit_status(err.category()))
}

/// Bad flags exit with 1, `--help` and `--version` with 0
pub fn usage_status(err: &clap::Error) -> u8 {
    if err.exit_code() == 0 { 0 } else { 1 }
}

/// Relative file names land in the output directory, absolute ones are kept
pub fn destination(output: Option<&Path>, dir: &Path, default_name: String) -> PathBuf {
    match output {
        Some(file) => dir.join(file),
        None => dir.join(default_name),
    }
}

/// Like [`destination`], but also creates the directory the file goes into
pub fn prepare_destination(
    output: Option<&Path>,
    dir: &Path,
    default_name: String,
) -> Result<PathBuf> {
    let dest = destination(output, dir, default_name);
    let parent = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(dir);
    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    Ok(dest)
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// Nothing was asked for, the caller shows the help text
    NeedsPrompt,
}

/// Runs whatever the flags ask for. The config is only read by actions that use it, so a broken
/// config file doesn't lock out `--set-key`.
pub async fn run(cli: Cli, config: impl FnOnce() -> Result<Config>) -> Result<Outcome> {
    let action = cli.action()?;
    debug!("Running {action:?}");

    let cfg = if action.needs_config() {
        config()?
    } else {
        Config::default()
    };

    let output_dir = match cli.dir.clone().or_else(|| cfg.output_dir.clone()) {
        Some(dir) => dir,
        None => default_output_dir()?,
    };

    match action {
        Action::SaveCredentials => save_credentials(&cli)?,
        Action::List { limit } => {
            let recent = history::recent(&output_dir, limit)?;
            report::recent(&recent, &output_dir);
        }
        Action::Edit { image, prompt } => {
            let model = cli.model.or(cfg.model).unwrap_or_default();
            let creds = Credentials::load(model.needs_project())?;
            let request = Request::edit(prompt, &image, cli.params())?;

            report::heading(&format!("Editing image with {model}..."));
            report::source_image(&image);
            create(&cli, &cfg, model, creds, request, &output_dir).await?;
        }
        Action::Generate { prompt } => {
            let model = cli.model.or(cfg.model).unwrap_or_default();
            let creds = Credentials::load(model.needs_project())?;
            let request = Request::generate(prompt, cli.params());

            report::heading(&format!("Generating with {model}..."));
            create(&cli, &cfg, model, creds, request, &output_dir).await?;
        }
        Action::Usage => return Ok(Outcome::NeedsPrompt),
    }

    Ok(Outcome::Done)
}

fn save_credentials(cli: &Cli) -> Result<()> {
    if let Some(key) = &cli.set_key {
        let path = credentials::key_file()?;
        credentials::save(&path, key)?;
        report::success(&format!("API key saved → {}", path.display()));
    }
    if let Some(project) = &cli.set_project {
        let path = credentials::project_file()?;
        credentials::save(&path, project)?;
        report::success(&format!("Project id saved → {}", path.display()));
    }
    Ok(())
}

async fn create(
    cli: &Cli,
    cfg: &Config,
    model: Model,
    creds: Credentials,
    request: Request,
    output_dir: &Path,
) -> Result<()> {
    report::prompt(&request.prompt);
    report::cost_estimate(model.estimate_cost(request.params.count));

    let location = cfg.location.as_deref().unwrap_or(DEFAULT_LOCATION);
    let imgmod = model.make(creds, location)?;
    let images = imgmod.generate(&request).await?;
    info!("Received {} image(s) from {}", images.len(), imgmod.model());

    let (prefix, label) = if request.is_edit() {
        ("nano_edited", "Edited")
    } else {
        ("nano", "Saved")
    };
    let name = output::timestamped_name(prefix, Local::now().naive_local(), "png");
    let dest = prepare_destination(cli.output.as_deref(), output_dir, name)?;

    for (i, image) in images.iter().enumerate() {
        let path = output::numbered(&dest, i, images.len());
        let path = output::write_image(&image.data, &path)?;
        report::saved(label, &path);
        report::preview_hint(&path);
    }

    Ok(())
}
