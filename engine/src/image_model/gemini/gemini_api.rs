use std::time::Duration;

use base64::{Engine as _, prelude::BASE64_STANDARD};
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    image_model::{GoogleApiError, Image},
};

pub const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub role: &'static str,
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    InlineData(Blob),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    /// base64
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    pub text: Option<String>,
    #[serde(alias = "inline_data")]
    pub inline_data: Option<Blob>,
    /// Intermediate images the model produced while reasoning
    #[serde(default)]
    pub thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
    pub block_reason_message: Option<String>,
}

/// Sends a generateContent request and returns the parsed response
pub async fn query(
    body: &RequestBody,
    model: &str,
    api_key: &str,
    client: &Client,
) -> Result<GenerateContentResponse> {
    let url = format!("{BASE_URL}/{model}:generateContent");
    debug!("POST {url}");

    let resp = client
        .post(&url)
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

/// Pulls the final images out of a response. A response without any is reported as blocked,
/// with the most specific reason the API gave us.
pub fn extract_images(response: GenerateContentResponse) -> Result<Vec<Image>> {
    if response.candidates.is_empty() {
        let reason = response.prompt_feedback.and_then(|fb| {
            match (fb.block_reason, fb.block_reason_message) {
                (Some(r), Some(m)) => Some(format!("{r} ({m})")),
                (r, m) => r.or(m),
            }
        });
        return Err(Error::Blocked { reason });
    }

    let mut images = vec![];
    let mut texts = vec![];
    let mut finish_reason = None;

    for candidate in response.candidates {
        if finish_reason.is_none() {
            finish_reason = candidate.finish_reason;
        }
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        for part in parts {
            if part.thought {
                continue;
            }
            if let Some(blob) = part.inline_data {
                let data = BASE64_STANDARD
                    .decode(blob.data.as_bytes())
                    .map_err(|e| Error::InvalidResponse(format!("bad base64 image data: {e}")))?;
                images.push(Image {
                    data,
                    mime_type: Some(blob.mime_type),
                });
            } else if let Some(text) = part.text {
                texts.push(text);
            }
        }
    }

    if images.is_empty() {
        let text = texts.join(" ");
        let reason = match finish_reason {
            Some(r) if r != "STOP" => Some(r),
            _ if !text.trim().is_empty() => Some(text.trim().to_string()),
            r => r,
        };
        return Err(Error::Blocked { reason });
    }

    Ok(images)
}
