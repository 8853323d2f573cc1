use std::collections::BTreeMap;

use async_trait::async_trait;

/// Outbound dependency request, fully built.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequestParts {
    pub method: String,
    pub url: url::Url,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponseParts {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum HttpError {
    #[error("dependency unreachable: {0}")]
    Network(String),
    #[error("dependency response exceeds {max_bytes} bytes")]
    ResponseTooLarge { max_bytes: usize },
    #[error("dependency transport error: {0}")]
    Other(String),
}

/// Transport for dependency calls.
///
/// Deadlines are enforced by the engine around the whole call, not here.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(
        &self,
        req: HttpRequestParts,
        max_response_bytes: usize,
    ) -> Result<HttpResponseParts, HttpError>;
}

pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new(concat!("destiny/", env!("CARGO_PKG_VERSION")))
            .unwrap_or_else(|_| Self { client: reqwest::Client::new() })
    }
}

impl ReqwestHttpClient {
    pub fn new(user_agent: &str) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| HttpError::Other(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn send(
        &self,
        req: HttpRequestParts,
        max_response_bytes: usize,
    ) -> Result<HttpResponseParts, HttpError> {
        let method = reqwest::Method::from_bytes(req.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| HttpError::Other(format!("bad method {}: {e}", req.method)))?;

        let headers = req
            .headers
            .into_iter()
            // reqwest derives Content-Length from the body.
            .filter(|(name, _)| !name.eq_ignore_ascii_case("content-length"))
            .fold(self.client.request(method, req.url), |rb, (name, value)| rb.header(name, value));
        let rb = if req.body.is_empty() {
            headers
        } else {
            headers.body(req.body)
        };

        let mut resp = rb.send().await.map_err(map_reqwest_error)?;
        let too_large = HttpError::ResponseTooLarge {
            max_bytes: max_response_bytes,
        };
        if resp.content_length().is_some_and(|len| len > max_response_bytes as u64) {
            return Err(too_large);
        }

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();

        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(map_reqwest_error)? {
            if body.len() + chunk.len() > max_response_bytes {
                return Err(too_large);
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponseParts { status, headers, body })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> HttpError {
    if e.is_connect() || e.is_request() {
        HttpError::Network(e.to_string())
    } else {
        HttpError::Other(e.to_string())
    }
}
