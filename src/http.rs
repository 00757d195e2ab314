//! HTTP client wrapper shared by both provider clients.

use reqwest::{Body, Client, Response};
use serde_json::Value;

use crate::error::{MirrorError, Result};

/// HTTP client for making requests to the provider APIs.
///
/// Every method resolves to an error if the response status is not a
/// success, with the response body carried as the error message.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Make a GET request, following redirects.
    ///
    /// # Arguments
    /// * `url` - URL to fetch
    /// * `bearer` - optional OAuth bearer token
    /// * `range` - optional inclusive byte range for partial content
    pub async fn get(
        &self,
        url: &str,
        bearer: Option<&str>,
        range: Option<(u64, u64)>,
    ) -> Result<Response> {
        let mut request = self.client.get(url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some((start, end)) = range {
            request = request.header("Range", format!("bytes={start}-{end}"));
        }
        Self::check(request.send().await?).await
    }

    /// Make a POST request with a JSON body.
    pub async fn post_json(&self, url: &str, bearer: Option<&str>, body: &Value) -> Result<Response> {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        Self::check(request.send().await?).await
    }

    /// Make a POST request with a form-urlencoded body.
    pub async fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<Response> {
        let request = self.client.post(url).form(form);
        Self::check(request.send().await?).await
    }

    /// Make a PUT request streaming `body` as the content.
    pub async fn put_stream(&self, url: &str, bearer: Option<&str>, body: Body) -> Result<Response> {
        let mut request = self.client.put(url).body(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        Self::check(request.send().await?).await
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(MirrorError::Api {
            code: status.as_u16(),
            message,
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}
