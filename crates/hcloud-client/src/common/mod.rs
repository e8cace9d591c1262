//! Common utilities for the hcloud API client
//!
//! Provides the authenticated HTTP wrapper and pagination shared by all
//! resource endpoints.

pub mod query;

use crate::error::HcloudError;
use crate::models::{ErrorResponse, Meta};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

/// Page size requested for list endpoints (the API maximum)
pub const PER_PAGE: u64 = 50;

/// A list response that carries one page of `T` plus pagination metadata
pub trait Paginated<T> {
    fn into_parts(self) -> (Vec<T>, Meta);
}

/// HTTP client wrapper with bearer authentication
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Turn a non-success response into an [`HcloudError`].
    ///
    /// The API answers errors with `{"error": {"code", "message"}}`; bodies
    /// that do not parse fall back to the HTTP status.
    async fn error_from_response(method: &str, path: &str, response: Response) -> HcloudError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorResponse>(&body).ok();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HcloudError::Authentication(
                parsed.map_or(body, |e| e.error.message),
            ),
            StatusCode::NOT_FOUND => HcloudError::NotFound(format!("{} {}", method, path)),
            _ => match parsed {
                Some(e) => HcloudError::Api {
                    code: e.error.code,
                    message: e.error.message,
                },
                None => HcloudError::Api {
                    code: status.as_u16().to_string(),
                    message: format!("{} {} failed: {}", method, path, body),
                },
            },
        }
    }

    /// Make a GET request
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, HcloudError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("GET", path, response).await);
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Make a GET request, mapping 404 to `None`
    pub async fn get_optional<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
    ) -> Result<Option<T>, HcloudError> {
        match self.get(path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Make a POST request
    pub async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, HcloudError> {
        let url = self.build_url(path);
        debug!(body = %body, "POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("POST", path, response).await);
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), HcloudError> {
        let url = self.build_url(path);
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("DELETE", path, response).await);
        }

        Ok(())
    }

    /// Fetch every page of a list endpoint.
    ///
    /// `path` must not carry `page`/`per_page`; they are appended here and
    /// advanced along `meta.pagination.next_page`.
    pub async fn fetch_all_pages<T, L>(&self, path: &str) -> Result<Vec<T>, HcloudError>
    where
        L: Paginated<T> + for<'de> Deserialize<'de>,
    {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut all_results = Vec::new();
        let mut page = 1;

        loop {
            let page_path = format!("{}{}page={}&per_page={}", path, separator, page, PER_PAGE);
            debug!("Fetching page: {}", page_path);

            let list: L = self.get(&page_path).await?;
            let (items, meta) = list.into_parts();
            all_results.extend(items);

            match meta.pagination.and_then(|p| p.next_page) {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(all_results)
    }

    /// Build query string from filters
    pub fn build_query_string(&self, filters: &[(&str, &str)]) -> String {
        filters
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http() -> HttpClient {
        HttpClient::new(Client::new(), "https://api.example.test/v1/".to_string(), "t".to_string())
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let http = http();
        assert_eq!(http.base_url(), "https://api.example.test/v1");
        assert_eq!(http.build_url("/networks"), "https://api.example.test/v1/networks");
    }

    #[test]
    fn test_query_string_is_encoded() {
        let http = http();
        assert_eq!(
            http.build_query_string(&[("name", "shoot--a b"), ("label_selector", "role=x")]),
            "name=shoot--a%20b&label_selector=role%3Dx"
        );
        assert_eq!(http.build_query_string(&[]), "");
    }
}
