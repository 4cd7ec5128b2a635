use crate::image_model::ImageModel;

pub mod credentials;
pub mod error;
pub mod history;
pub mod image_model;
pub mod output;

pub use error::{Error, Result};

pub type ImgModBox = Box<dyn ImageModel + Send + Sync>;
