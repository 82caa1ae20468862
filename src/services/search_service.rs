//! Client for the console's user lookup endpoint
//!
//! `GET /admin/api/usuarios/buscar?q=<query>` answers with
//! `{"results": [{"id": ..., "text": "..."}]}`. Extra fields are ignored; a
//! body without `results` is a decode error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use serde::Deserialize;
use thiserror::Error;
use tracing::trace;
use url::Url;

use crate::config::SearchConfig;
use crate::core::SearchResult;

pub const DEFAULT_ENDPOINT: &str = "/admin/api/usuarios/buscar";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("user search request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("user search response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid user search endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

/// Parse a raw endpoint body into its result list
pub fn parse_search_response(body: &str) -> Result<Vec<SearchResult>, SearchError> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response.results)
}

/// Anything that can look users up by a free-text query
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}

/// `UserDirectory` backed by the console's HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpUserDirectory {
    http: reqwest::Client,
    endpoint: Url,
    session_cookie: Option<String>,
}

impl HttpUserDirectory {
    pub fn new(
        base_url: &Url,
        endpoint: &str,
        timeout: Duration,
        session_cookie: Option<String>,
    ) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: base_url.join(endpoint)?,
            session_cookie,
        })
    }

    pub fn from_config(cfg: &SearchConfig) -> Result<Self, SearchError> {
        Self::new(
            &cfg.base_url,
            &cfg.endpoint,
            Duration::from_secs(cfg.timeout_secs),
            cfg.session_cookie.clone(),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let mut request = self.http.get(self.endpoint.clone()).query(&[("q", query)]);
        if let Some(cookie) = &self.session_cookie {
            request = request.header(COOKIE, cookie);
        }
        let body = request.send().await?.error_for_status()?.text().await?;
        trace!("user search '{query}' answered {} bytes", body.len());
        parse_search_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_ignores_extra_fields() {
        let results = parse_search_response(
            r#"{"results": [{"id": 3, "text": "Ana (ana@x.es)", "rol": "admin"}], "total": 1}"#,
        )
        .unwrap();
        assert_eq!(results, vec![SearchResult::new("3", "Ana (ana@x.es)")]);
    }

    #[test]
    fn test_parse_requires_results() {
        let err = parse_search_response(r#"{"items": []}"#).unwrap_err();
        assert!(matches!(err, SearchError::Decode(_)));
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(parse_search_response("<html>login</html>").is_err());
    }

    #[test]
    fn test_endpoint_is_joined_to_base() {
        let base = Url::parse("https://tempus.example.com/app/").unwrap();
        let dir = HttpUserDirectory::new(&base, DEFAULT_ENDPOINT, Duration::from_secs(5), None)
            .unwrap();
        assert_eq!(
            dir.endpoint().as_str(),
            "https://tempus.example.com/admin/api/usuarios/buscar"
        );
    }
}
