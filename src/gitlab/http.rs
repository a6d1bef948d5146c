//! HTTP utilities for GitLab REST API calls

use crate::error::{ProviderError, Result};
use reqwest::header::HeaderMap;
use reqwest::{Certificate, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// GitLab authenticates API calls with this header
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// Pagination cursor set by GitLab on list endpoints; empty on the last page
const NEXT_PAGE_HEADER: &str = "x-next-page";

const USER_AGENT: &str = concat!("gitlab-provider/", env!("CARGO_PKG_VERSION"));

/// Sanitize response body for logging
/// Truncates long responses and drops control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.chars().count() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull the human readable message out of a GitLab error body.
/// GitLab uses `message` (string or field->errors object) and sometimes `error`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("message").or_else(|| value.get("error"))? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn api_error(status: StatusCode, body: &str) -> ProviderError {
    let message = extract_error_message(body).unwrap_or_else(|| sanitize_for_log(body));
    if status == StatusCode::NOT_FOUND {
        ProviderError::NotFound(message)
    } else {
        ProviderError::Api { status, message }
    }
}

fn next_page(headers: &HeaderMap) -> Option<u32> {
    headers
        .get(NEXT_PAGE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|page| *page > 0)
}

/// A successful API response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// Next page number when the endpoint is paginated and more pages follow
    pub next_page: Option<u32>,
    pub body: String,
}

impl ApiResponse {
    /// Decode the response body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Decode a list response together with its pagination cursor
    pub fn into_page<T: DeserializeOwned>(self) -> Result<Page<T>> {
        let items = if self.body.trim().is_empty() {
            Vec::new()
        } else {
            self.json()?
        };

        Ok(Page {
            items,
            next_page: self.next_page,
        })
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page: Option<u32>) -> Self {
        Self { items, next_page }
    }

    /// A page with no successor
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

/// Pagination options for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub page: u32,
    pub per_page: Option<u32>,
}

impl ListOptions {
    /// Request a given page with the remote's default page size
    pub fn page(page: u32) -> Self {
        Self {
            page,
            per_page: None,
        }
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Append `page`/`per_page` to a URL
    pub fn apply(&self, url: &mut Url) {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("page", &self.page.to_string());
        if let Some(per_page) = self.per_page {
            pairs.append_pair("per_page", &per_page.to_string());
        }
    }
}

/// TLS settings for the underlying HTTP client
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// Skip certificate verification
    pub insecure: bool,
    /// Additional PEM encoded root certificate
    pub ca_cert_pem: Option<Vec<u8>>,
}

/// HTTP client wrapper for GitLab API calls
#[derive(Clone)]
pub struct GitlabHttpClient {
    client: Client,
}

impl GitlabHttpClient {
    /// Create a new HTTP client
    pub fn new(options: &HttpOptions) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);

        if let Some(pem) = &options.ca_cert_pem {
            builder = builder.add_root_certificate(Certificate::from_pem(pem)?);
        }
        if options.insecure {
            tracing::warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Make a GET request to the GitLab API
    pub async fn get(&self, url: Url, token: &str) -> Result<ApiResponse> {
        self.execute::<Value>(Method::GET, url, token, None).await
    }

    /// Make a POST request with a JSON body
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: Url,
        token: &str,
        body: &B,
    ) -> Result<ApiResponse> {
        self.execute(Method::POST, url, token, Some(body)).await
    }

    /// Make a PUT request with a JSON body
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: Url,
        token: &str,
        body: &B,
    ) -> Result<ApiResponse> {
        self.execute(Method::PUT, url, token, Some(body)).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: Url, token: &str) -> Result<ApiResponse> {
        self.execute::<Value>(Method::DELETE, url, token, None).await
    }

    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        token: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse> {
        tracing::debug!("{} {}", method, url.path());

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header(TOKEN_HEADER, token);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;

        let status = response.status();
        let next_page = next_page(response.headers());
        let body = response.text().await?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!(
                "API error: {} {} -> {} - {}",
                method,
                url.path(),
                status,
                sanitize_for_log(&body)
            );
            return Err(api_error(status, &body));
        }

        Ok(ApiResponse {
            status,
            next_page,
            body,
        })
    }
}
