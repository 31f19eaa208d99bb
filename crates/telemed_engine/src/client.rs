use std::time::Duration;

use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use telemed_logging::{telemed_debug, telemed_warn};
use url::Url;

use crate::{
    AnalysisBody, ApiCall, ApiError, ApiReply, FailureKind, ImageFile, ResearchBody, ResearchHit,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub health_timeout: Duration,
    pub max_response_bytes: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            health_timeout: Duration::from_secs(5),
            max_response_bytes: 2 * 1024 * 1024,
        }
    }
}

impl ApiSettings {
    /// Resolves `path` (e.g. `api/chat`) below the configured base address,
    /// keeping any path prefix the base already has.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::new(FailureKind::InvalidRequest, "base url cannot hold a path")
            })?
            .pop_if_empty()
            .extend(path.split('/'));
        Ok(url)
    }
}

#[async_trait::async_trait]
pub trait ApiClient: Send + Sync {
    /// Returns the `status` field reported by the service.
    async fn health(&self) -> Result<String, ApiError>;

    async fn call(&self, call: &ApiCall) -> Result<ApiReply, ApiError>;
}

#[derive(Debug, Serialize)]
struct ChatPayload<'a> {
    message: &'a str,
    language: &'a str,
}

#[derive(Debug, Serialize)]
struct AnalyzeTextPayload<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ResearchPayload<'a> {
    query: &'a str,
    num_results: u8,
}

#[derive(Debug, Deserialize)]
struct HealthReply {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    response: String,
}

#[derive(Debug, Deserialize)]
struct ExtractionReply {
    #[serde(alias = "text")]
    extracted_text: String,
}

#[derive(Debug, Clone)]
pub struct ReqwestApiClient {
    settings: ApiSettings,
    client: reqwest::Client,
}

impl ReqwestApiClient {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_response_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(ApiError::new(
                    FailureKind::Protocol,
                    format!("response of {content_len} bytes exceeds {max_bytes}"),
                ));
            }
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = body.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(ApiError::new(
                    FailureKind::Protocol,
                    format!("response exceeds {max_bytes} bytes"),
                ));
            }
            body.extend_from_slice(&chunk);
        }
        telemed_debug!("Received {} byte body", body.len());

        serde_json::from_slice(&body)
            .map_err(|err| ApiError::new(FailureKind::Protocol, err.to_string()))
    }

    fn post(&self, call: &ApiCall) -> Result<reqwest::RequestBuilder, ApiError> {
        let url = self.settings.endpoint(call.endpoint())?;
        let request = self.client.post(url);
        let request = match call {
            ApiCall::Chat { message, language } => {
                request.json(&ChatPayload { message, language })
            }
            ApiCall::AnalyzeText { text, context } => request.json(&AnalyzeTextPayload {
                text,
                context: context.as_deref(),
            }),
            ApiCall::AnalyzeImage(image) | ApiCall::ExtractText(image) => {
                request.multipart(image_form(image)?)
            }
            ApiCall::Research { query, num_results } => request.json(&ResearchPayload {
                query,
                num_results: *num_results,
            }),
        };
        Ok(request)
    }
}

#[async_trait::async_trait]
impl ApiClient for ReqwestApiClient {
    async fn health(&self) -> Result<String, ApiError> {
        let url = self.settings.endpoint("api/health")?;
        let request = self.client.get(url).timeout(self.settings.health_timeout);
        let reply: HealthReply = self.send(request).await?;
        Ok(reply.status)
    }

    async fn call(&self, call: &ApiCall) -> Result<ApiReply, ApiError> {
        let request = self.post(call)?;
        let reply = match call {
            ApiCall::Chat { .. } => {
                let reply: ChatReply = self.send(request).await?;
                ApiReply::Chat(reply.response)
            }
            ApiCall::AnalyzeText { .. } | ApiCall::AnalyzeImage(_) => {
                ApiReply::Analysis(self.send::<AnalysisBody>(request).await?)
            }
            ApiCall::ExtractText(_) => {
                let reply: ExtractionReply = self.send(request).await?;
                ApiReply::ExtractedText(reply.extracted_text)
            }
            ApiCall::Research { .. } => {
                let mut body: ResearchBody = self.send(request).await?;
                body.results.iter_mut().for_each(sanitize_relevance);
                ApiReply::Research(body)
            }
        };
        Ok(reply)
    }
}

fn image_form(image: &ImageFile) -> Result<Form, ApiError> {
    let part = Part::bytes(image.bytes.to_vec())
        .file_name(image.name.clone())
        .mime_str(&image.media_type)
        .map_err(|err| ApiError::new(FailureKind::InvalidRequest, err.to_string()))?;
    Ok(Form::new().part("file", part))
}

fn sanitize_relevance(hit: &mut ResearchHit) {
    if let Some(score) = hit.relevance_score {
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            telemed_warn!(
                "Dropping out-of-range relevance score {} for {:?}",
                score,
                hit.title
            );
            hit.relevance_score = None;
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Protocol, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base: &str) -> ApiSettings {
        ApiSettings {
            base_url: Url::parse(base).unwrap(),
            ..ApiSettings::default()
        }
    }

    #[test]
    fn endpoint_appends_below_base() {
        assert_eq!(
            settings("http://localhost:8000").endpoint("api/chat").unwrap().as_str(),
            "http://localhost:8000/api/chat"
        );
        assert_eq!(
            settings("https://example.org/telemed/")
                .endpoint("api/research")
                .unwrap()
                .as_str(),
            "https://example.org/telemed/api/research"
        );
    }

    #[test]
    fn endpoint_rejects_opaque_base() {
        let err = settings("mailto:ops@example.org")
            .endpoint("api/health")
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidRequest);
    }

    #[test]
    fn relevance_outside_unit_range_is_dropped() {
        let mut hit = ResearchHit {
            title: "t".to_string(),
            excerpt: "e".to_string(),
            url: None,
            relevance_score: Some(87.0),
        };
        sanitize_relevance(&mut hit);
        assert_eq!(hit.relevance_score, None);

        hit.relevance_score = Some(0.42);
        sanitize_relevance(&mut hit);
        assert_eq!(hit.relevance_score, Some(0.42));
    }
}
