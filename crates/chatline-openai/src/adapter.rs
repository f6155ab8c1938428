use std::{sync::Arc, time::Duration};

use reqwest::Client as HttpClient;

use crate::{client::OpenAiClient, error::OpenAiError};

/// Streaming chat-completion client for OpenAI-compatible endpoints.
///
/// Implements [`chatline_core::provider::StreamingChatProvider`]: every call
/// to `start` yields a cancellable [`chatline_core::provider::ReplyHandle`]
/// that decodes the `data:` stream into cumulative text deltas and falls
/// back to one non-streaming request when the stream fails before any text
/// arrived.
///
/// The client owns a connection-pooled `reqwest::Client`; clone it freely.
#[derive(Clone, Debug)]
pub struct StreamingClient {
    pub(crate) client: Arc<OpenAiClient>,
}

impl StreamingClient {
    /// Client for the default endpoint with default HTTP settings.
    pub fn new() -> Result<Self, OpenAiError> {
        StreamingClientBuilder::new().build()
    }

    pub fn builder() -> StreamingClientBuilder {
        StreamingClientBuilder::new()
    }

    /// URL requests are posted to.
    pub fn endpoint(&self) -> String {
        self.client.endpoint()
    }
}

/// Builder for [`StreamingClient`].
///
/// ```rust,no_run
/// use chatline_openai::StreamingClientBuilder;
///
/// let client = StreamingClientBuilder::new()
///     .with_base_url("http://localhost:8080/v1")
///     .build()
///     .expect("HTTP client");
/// ```
#[derive(Default)]
pub struct StreamingClientBuilder {
    pub(crate) base_url: Option<String>,
    pub(crate) http: Option<HttpClient>,
    pub(crate) connect_timeout: Option<Duration>,
}

impl StreamingClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base URL up to and including the API version, e.g.
    /// `https://api.openai.com/v1`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Use a preconfigured `reqwest::Client` (proxies, custom TLS, …).
    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    /// Connect timeout for the default HTTP client. No total timeout is set:
    /// a healthy stream may run for minutes.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// # Errors
    ///
    /// * [`OpenAiError::Http`] – if the default HTTP client cannot be built.
    pub fn build(self) -> Result<StreamingClient, OpenAiError> {
        let http = match self.http {
            Some(http) => http,
            None => HttpClient::builder()
                .connect_timeout(self.connect_timeout.unwrap_or(Duration::from_secs(30)))
                .build()?,
        };

        Ok(StreamingClient {
            client: Arc::new(OpenAiClient::with_http(http, self.base_url)),
        })
    }
}
