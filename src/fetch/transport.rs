use crate::fetch::{Endpoint, FetchError, RequestParams};
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

const HEADERS: &[(&str, &str)] = &[
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:72.0) Gecko/20100101 Firefox/72.0",
    ),
    ("accept", "application/json, text/plain, */*"),
    ("accept-language", "en-US,en;q=0.5"),
    ("x-nba-stats-origin", "stats"),
    ("x-nba-stats-token", "true"),
    ("connection", "keep-alive"),
    ("referer", "https://stats.nba.com/"),
];

/// Issues one GET for an endpoint and returns the raw response body.
pub trait Transport {
    fn get(&self, endpoint: Endpoint, params: &RequestParams) -> Result<String, FetchError>;
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for &(name, value) in HEADERS {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }
}

impl Transport for HttpTransport {
    fn get(&self, endpoint: Endpoint, params: &RequestParams) -> Result<String, FetchError> {
        let url = self.url(endpoint);
        let query = params.pairs().collect::<Vec<_>>();
        let resp = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }
        resp.text()
            .map_err(|source| FetchError::Transport { url, source })
    }
}
