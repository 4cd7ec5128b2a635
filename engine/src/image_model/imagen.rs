use std::pin::Pin;

use base64::{Engine as _, prelude::BASE64_STANDARD};
use log::debug;

use crate::{
    error::Result,
    image_model::{Image, ImageModel, Model, Request},
};

pub mod imagen_api;
use imagen_api::{EncodedImage, Instance, Parameters, ReferenceImage, RequestBody};

pub const GENERATE_MODEL: &str = "imagen-3.0-generate-002";
/// Only the capability model accepts reference images
pub const EDIT_MODEL: &str = "imagen-3.0-capability-001";

#[derive(Clone)]
pub struct Imagen {
    api_key: String,
    project: String,
    location: String,
    client: reqwest::Client,
}

impl Imagen {
    pub fn new(api_key: String, project: String, location: String) -> Self {
        Self {
            api_key,
            project,
            location,
            client: reqwest::Client::new(),
        }
    }

    fn url_for(&self, request: &Request) -> String {
        let model = if request.is_edit() {
            EDIT_MODEL
        } else {
            GENERATE_MODEL
        };
        imagen_api::endpoint(&self.project, &self.location, model)
    }
}

pub fn build_body(request: &Request) -> RequestBody {
    let params = &request.params;
    let reference_images = request
        .source
        .iter()
        .map(|source| ReferenceImage {
            reference_type: "REFERENCE_TYPE_RAW",
            reference_id: 1,
            reference_image: EncodedImage {
                bytes_base64_encoded: BASE64_STANDARD.encode(&source.data),
            },
        })
        .collect();

    RequestBody {
        instances: vec![Instance {
            prompt: request.prompt.clone(),
            reference_images,
        }],
        parameters: Parameters {
            sample_count: params.count,
            aspect_ratio: params.aspect_ratio.map(|ar| ar.to_string()),
            negative_prompt: params.negative_prompt.clone(),
            seed: params.seed,
            add_watermark: params.seed.map(|_| false),
            guidance_scale: params.guidance_scale,
            edit_mode: request.is_edit().then_some("EDIT_MODE_DEFAULT"),
        },
    }
}

impl ImageModel for Imagen {
    fn generate<'a>(
        &'a self,
        request: &'a Request,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Image>>> + Send + 'a>> {
        let body = build_body(request);
        let url = self.url_for(request);

        Box::pin(async move {
            let response = imagen_api::predict(&body, &url, &self.api_key, &self.client).await?;
            debug!("Got {} prediction(s)", response.predictions.len());
            imagen_api::extract_images(response)
        })
    }

    fn model(&self) -> Model {
        Model::Imagen
    }
}
