//! NetBox REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Collection, Query, Record, RecordStore};
use crate::config::NetboxSettings;
use crate::error::{StoreError, StoreResult};

/// One page of a list endpoint
#[derive(Deserialize)]
struct Page {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    results: Vec<Record>,
}

/// Client for the NetBox REST API authenticated with an API token
#[derive(Debug, Clone)]
pub struct NetboxClient {
    http: reqwest::Client,
    api_root: String,
}

impl NetboxClient {
    /// Builds a client from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Client` if the token is not a valid header value
    /// or the TLS backend fails to initialize.
    pub fn new(settings: &NetboxSettings) -> StoreResult<Self> {
        let mut auth = HeaderValue::from_str(&settings.authorization())
            .map_err(|e| StoreError::Client(format!("invalid API token: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if !settings.verify_ssl {
            tracing::warn!("TLS certificate verification is disabled for NetBox");
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .danger_accept_invalid_certs(!settings.verify_ssl)
            .build()
            .map_err(|e| StoreError::Client(e.to_string()))?;

        Ok(Self {
            http,
            api_root: settings.api_root(),
        })
    }

    /// API root requests are made against
    #[must_use]
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.api_root)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        tracing::debug!(%method, %path, "NetBox request");
        self.http.request(method, self.url(path))
    }

    async fn send(path: &str, request: RequestBuilder) -> StoreResult<Response> {
        request.send().await.map_err(|e| StoreError::Request {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> StoreResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| StoreError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl RecordStore for NetboxClient {
    async fn get(&self, collection: Collection, id: u64) -> StoreResult<Option<Record>> {
        let path = format!("{}{id}/", collection.path());
        let response = Self::send(&path, self.request(Method::GET, &path)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(&path, response).await.map(Some)
    }

    async fn filter(&self, collection: Collection, query: &Query) -> StoreResult<Vec<Record>> {
        let path = collection.path();
        let request = self.request(Method::GET, path).query(query.pairs());
        let mut page: Page = Self::decode(path, Self::send(path, request).await?).await?;

        let mut records = std::mem::take(&mut page.results);
        while let Some(next) = page.next.take() {
            tracing::trace!(%next, "Following pagination link");
            page = Self::decode(path, Self::send(path, self.http.get(&next)).await?).await?;
            records.append(&mut page.results);
        }
        Ok(records)
    }

    async fn create(&self, collection: Collection, payload: &Value) -> StoreResult<Record> {
        let path = collection.path();
        let request = self.request(Method::POST, path).json(payload);
        Self::decode(path, Self::send(path, request).await?).await
    }

    async fn patch(
        &self,
        collection: Collection,
        id: u64,
        payload: &Value,
    ) -> StoreResult<Record> {
        let path = format!("{}{id}/", collection.path());
        let request = self.request(Method::PATCH, &path).json(payload);
        let response = Self::send(&path, request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                collection: collection.path(),
                id,
            });
        }
        Self::decode(&path, response).await
    }
}
