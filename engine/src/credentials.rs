//! Plain-text credential files in the user's home directory.
//!
//! The key file holds the API key, the project file the cloud project id that the Vertex AI
//! backend needs. Both are read once per run and trimmed.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};

const KEY_FILE_NAME: &str = ".nano_banana_pro_key";
const PROJECT_FILE_NAME: &str = ".nano_banana_pro_project";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub project: Option<String>,
}

impl Credentials {
    /// Loads the key and, if `with_project` is set, the project id from their default locations
    pub fn load(with_project: bool) -> Result<Self> {
        let api_key = load_api_key(&key_file()?)?;
        let project = if with_project {
            Some(load_project(&project_file()?)?)
        } else {
            None
        };
        Ok(Self { api_key, project })
    }
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| Error::Config("Couldn't find home dir".into()))
}

pub fn key_file() -> Result<PathBuf> {
    Ok(home_dir()?.join(KEY_FILE_NAME))
}

pub fn project_file() -> Result<PathBuf> {
    Ok(home_dir()?.join(PROJECT_FILE_NAME))
}

pub fn load_api_key(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::MissingCredential {
            path: path.to_path_buf(),
        });
    }
    read_trimmed(path)
}

pub fn load_project(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::MissingProject {
            path: path.to_path_buf(),
        });
    }
    read_trimmed(path)
}

fn read_trimmed(path: &Path) -> Result<String> {
    let value = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::EmptyCredential {
            path: path.to_path_buf(),
        });
    }
    Ok(value.to_string())
}

/// Writes a credential file readable only by the owner
pub fn save(path: &Path, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::InvalidInput("refusing to save an empty value".into()));
    }
    fs::write(path, format!("{value}\n")).map_err(|e| Error::io(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| Error::io(path, e))?;
    }

    Ok(())
}
