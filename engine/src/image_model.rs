use std::{fs, path::Path, pin::Pin};

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
    ImgModBox,
    credentials::Credentials,
    error::{Error, Result},
};

mod api_error;
pub use api_error::GoogleApiError;

pub mod gemini;
pub use gemini::Gemini;

pub mod imagen;
pub use imagen::Imagen;

pub const DEFAULT_LOCATION: &str = "us-central1";

#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    clap::ValueEnum,
    Serialize,
    Deserialize,
    Hash,
    PartialEq,
    Eq,
    Default,
)]
pub enum Model {
    /// Nano Banana Pro, served by the Gemini API
    #[default]
    #[strum(to_string = "Nano Banana Pro")]
    Gemini,
    /// Imagen 3 on Vertex AI
    #[strum(to_string = "Imagen 3")]
    Imagen,
}

impl Model {
    pub fn make(&self, credentials: Credentials, location: &str) -> Result<ImgModBox> {
        let Credentials { api_key, project } = credentials;
        let imgmod: ImgModBox = match self {
            Model::Gemini => Box::new(Gemini::new(api_key)),
            Model::Imagen => {
                let project = project.ok_or_else(|| {
                    Error::Config("the Imagen model needs a cloud project id".into())
                })?;
                Box::new(Imagen::new(api_key, project, location.to_string()))
            }
        };
        Ok(imgmod)
    }

    pub fn needs_project(&self) -> bool {
        matches!(self, Model::Imagen)
    }

    /// List price in USD, used for the estimate printed before a request
    pub fn cost_per_image(&self) -> f64 {
        match self {
            Model::Gemini => 0.134,
            Model::Imagen => 0.04,
        }
    }

    /// How many images a request for `count` actually yields
    pub fn images_per_request(&self, count: u8) -> u8 {
        match self {
            Model::Gemini => 1,
            Model::Imagen => count,
        }
    }

    pub fn estimate_cost(&self, count: u8) -> f64 {
        self.cost_per_image() * f64::from(self.images_per_request(count))
    }
}

#[derive(
    Debug, Clone, Copy, Display, clap::ValueEnum, Serialize, Deserialize, PartialEq, Eq,
)]
pub enum AspectRatio {
    #[value(name = "1:1")]
    #[strum(to_string = "1:1")]
    #[serde(rename = "1:1")]
    Square,
    #[value(name = "3:4")]
    #[strum(to_string = "3:4")]
    #[serde(rename = "3:4")]
    Portrait,
    #[value(name = "4:3")]
    #[strum(to_string = "4:3")]
    #[serde(rename = "4:3")]
    Landscape,
    #[value(name = "9:16")]
    #[strum(to_string = "9:16")]
    #[serde(rename = "9:16")]
    Tall,
    #[value(name = "16:9")]
    #[strum(to_string = "16:9")]
    #[serde(rename = "16:9")]
    Wide,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub aspect_ratio: Option<AspectRatio>,
    pub count: u8,
    pub negative_prompt: Option<String>,
    pub seed: Option<u32>,
    pub guidance_scale: Option<f32>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            aspect_ratio: None,
            count: 1,
            negative_prompt: None,
            seed: None,
            guidance_scale: None,
        }
    }
}

/// An existing picture handed to the model in edit mode
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
}

impl SourceImage {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ImageNotFound {
                path: path.to_path_buf(),
            });
        }
        let data = fs::read(path).map_err(|e| Error::io(path, e))?;
        Ok(Self {
            data,
            mime_type: mime_type_for(path),
        })
    }
}

/// Falls back to png for anything we don't recognize, the APIs sniff the content anyway
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "image/png",
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub prompt: String,
    pub source: Option<SourceImage>,
    pub params: GenerationParams,
}

impl Request {
    pub fn generate(prompt: impl Into<String>, params: GenerationParams) -> Self {
        Self {
            prompt: prompt.into(),
            source: None,
            params,
        }
    }

    pub fn edit(prompt: impl Into<String>, image: &Path, params: GenerationParams) -> Result<Self> {
        Ok(Self {
            prompt: prompt.into(),
            source: Some(SourceImage::load(image)?),
            params,
        })
    }

    pub fn is_edit(&self) -> bool {
        self.source.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Image {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
}

pub trait ImageModel {
    fn generate<'a>(
        &'a self,
        request: &'a Request,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Image>>> + Send + 'a>>;

    fn model(&self) -> Model;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_types() {
        assert_eq!(mime_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("dir/a.JPG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_type_for(Path::new("a.gif")), "image/gif");
        assert_eq!(mime_type_for(Path::new("a.tiff")), "image/png");
        assert_eq!(mime_type_for(Path::new("noext")), "image/png");
    }

    #[test]
    fn missing_source_image() {
        let err = Request::edit("add a crown", Path::new("/does/not/exist.png"), Default::default())
            .unwrap_err();
        assert!(matches!(err, Error::ImageNotFound { .. }));
    }

    #[test]
    fn imagen_requires_project() {
        let creds = Credentials {
            api_key: "key".into(),
            project: None,
        };
        let Err(err) = Model::Imagen.make(creds, DEFAULT_LOCATION) else {
            panic!("expected an error");
        };
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn cost_estimate() {
        assert!((Model::Imagen.estimate_cost(4) - 0.16).abs() < 1e-9);
        assert!((Model::Gemini.estimate_cost(1) - 0.134).abs() < 1e-9);
        assert!((Model::Gemini.estimate_cost(4) - 0.134).abs() < 1e-9);
    }

    #[test]
    fn aspect_ratio_display() {
        assert_eq!(AspectRatio::Wide.to_string(), "16:9");
        assert_eq!(AspectRatio::Square.to_string(), "1:1");
    }
}
