use reqwest::{
    Client as HttpClient, Response,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use tracing::debug;

use crate::{
    api_v1::{ChatCompletionRequest, ChatCompletionResponse},
    error::OpenAiError,
};

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Minimal HTTP client for the *chat/completions* endpoint.
///
/// * One request ▶ one response; the caller decides whether the body is read
///   as a stream or as a single JSON document.
/// * The API key is passed per call because it belongs to the request's
///   settings, not to the client.
/// * Shares a single `reqwest::Client`, so cloning `OpenAiClient` is cheap.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    http: HttpClient,
    base: String,
}

impl OpenAiClient {
    pub fn with_http(http: HttpClient, base_url: Option<String>) -> Self {
        let base = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        Self {
            http,
            base: base.trim_end_matches('/').to_owned(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base)
    }

    /// Send a **streaming** request and return the response once the status
    /// line and headers are in. The body is left unread for the decoder.
    pub async fn open_stream(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<Response, OpenAiError> {
        let mut headers = headers(api_key)?;
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        let resp = self
            .http
            .post(self.endpoint())
            .headers(headers)
            .json(request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            debug!(%status, "streaming request rejected");
            return Err(OpenAiError::Api { status, body });
        }

        Ok(resp)
    }

    /// Perform a **non-streaming** chat completion.
    pub async fn chat_completion(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OpenAiError> {
        let resp = self
            .http
            .post(self.endpoint())
            .headers(headers(api_key)?)
            .json(request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            debug!(%status, "non-streaming request rejected");
            return Err(OpenAiError::Api { status, body });
        }

        let bytes = resp.bytes().await?;
        let parsed: ChatCompletionResponse = serde_json::from_slice(&bytes)?;
        Ok(parsed)
    }
}

pub(crate) fn bearer(api_key: &str) -> Result<HeaderValue, OpenAiError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|_| OpenAiError::InvalidApiKey)?;
    value.set_sensitive(true);
    Ok(value)
}

fn headers(api_key: &str) -> Result<HeaderMap, OpenAiError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(AUTHORIZATION, bearer(api_key)?);
    Ok(headers)
}
