use std::pin::Pin;

use base64::{Engine as _, prelude::BASE64_STANDARD};
use log::{debug, warn};

use crate::{
    error::Result,
    image_model::{Image, ImageModel, Model, Request},
};

pub mod gemini_api;
use gemini_api::{Blob, Content, GenerationConfig, ImageConfig, Part, RequestBody};

pub const MODEL_NAME: &str = "gemini-3-pro-image-preview";

#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    client: reqwest::Client,
}

impl Gemini {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

/// Source image first, then the instruction, mirroring how the model is prompted for edits
pub fn build_body(request: &Request) -> RequestBody {
    let params = &request.params;
    if params.negative_prompt.is_some() {
        warn!("Gemini has no negative prompt, ignoring it");
    }
    if params.guidance_scale.is_some() {
        warn!("Gemini has no guidance scale, ignoring it");
    }
    if params.count > 1 {
        warn!(
            "Gemini returns one image per request, asked for {}",
            params.count
        );
    }

    let mut parts = vec![];
    if let Some(source) = &request.source {
        parts.push(Part::InlineData(Blob {
            mime_type: source.mime_type.to_string(),
            data: BASE64_STANDARD.encode(&source.data),
        }));
    }
    parts.push(Part::Text(request.prompt.clone()));

    RequestBody {
        contents: vec![Content {
            role: "user",
            parts,
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["TEXT", "IMAGE"],
            image_config: params.aspect_ratio.map(|ar| ImageConfig {
                aspect_ratio: ar.to_string(),
            }),
            seed: params.seed,
        },
    }
}

impl ImageModel for Gemini {
    fn generate<'a>(
        &'a self,
        request: &'a Request,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Image>>> + Send + 'a>> {
        let body = build_body(request);

        Box::pin(async move {
            let response = gemini_api::query(&body, MODEL_NAME, &self.api_key, &self.client).await?;
            debug!(
                "Got {} candidate(s), feedback: {:?}",
                response.candidates.len(),
                response.prompt_feedback
            );
            gemini_api::extract_images(response)
        })
    }

    fn model(&self) -> Model {
        Model::Gemini
    }
}
