use std::time::Duration;

use base64::{Engine as _, prelude::BASE64_STANDARD};
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    image_model::{GoogleApiError, Image},
};

#[derive(Debug, Serialize)]
pub struct RequestBody {
    pub instances: Vec<Instance>,
    pub parameters: Parameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub prompt: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reference_images: Vec<ReferenceImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceImage {
    pub reference_type: &'static str,
    pub reference_id: u32,
    pub reference_image: EncodedImage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedImage {
    pub bytes_base64_encoded: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    pub sample_count: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    /// Must be false when a seed is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_watermark: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance_scale: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_mode: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub bytes_base64_encoded: Option<String>,
    pub mime_type: Option<String>,
    pub rai_filtered_reason: Option<String>,
}

pub fn endpoint(project: &str, location: &str, model: &str) -> String {
    format!(
        "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:predict"
    )
}

pub async fn predict(
    body: &RequestBody,
    url: &str,
    api_key: &str,
    client: &Client,
) -> Result<PredictResponse> {
    debug!("POST {url}");

    let resp = client
        .post(url)
        .timeout(Duration::from_secs(60 * 3))
        .header("x-goog-api-key", api_key)
        .json(body)
        .send()
        .await?;

    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(GoogleApiError::from_response(status, &text).into());
    }

    serde_json::from_str(&text).map_err(|e| Error::InvalidResponse(e.to_string()))
}

/// Predictions filtered by the responsible-AI checks come back without bytes. If nothing usable
/// is left, the request counts as blocked.
pub fn extract_images(response: PredictResponse) -> Result<Vec<Image>> {
    let mut images = vec![];
    let mut reasons = vec![];

    for prediction in response.predictions {
        match prediction.bytes_base64_encoded {
            Some(encoded) => {
                let data = BASE64_STANDARD
                    .decode(encoded.as_bytes())
                    .map_err(|e| Error::InvalidResponse(format!("bad base64 image data: {e}")))?;
                images.push(Image {
                    data,
                    mime_type: prediction.mime_type,
                });
            }
            None => reasons.extend(prediction.rai_filtered_reason),
        }
    }

    if images.is_empty() {
        let reason = (!reasons.is_empty()).then(|| reasons.join("; "));
        return Err(Error::Blocked { reason });
    }

    Ok(images)
}
