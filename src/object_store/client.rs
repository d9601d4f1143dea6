//! HTTP client wrapper for uploading artifacts to the object store.
//!
//! The store is addressed path-style: `PUT {base}/{bucket}/{key}` with an optional
//! `api-key` header. Any non-success status is surfaced as a typed error rather than
//! aborting the request task.

use crate::config::get_config;
use crate::object_store::types::ObjectStoreError;
use reqwest::{Client, Method, StatusCode};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Lightweight HTTP client for object store operations.
pub struct ObjectStoreClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) bucket: String,
    pub(crate) api_key: Option<String>,
}

impl ObjectStoreClient {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, ObjectStoreError> {
        let config = get_config();
        let client = Client::builder()
            .user_agent("pdfsilo/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let base_url =
            normalize_base_url(&config.object_store_url).map_err(ObjectStoreError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            bucket = %config.bucket_name,
            has_api_key = %config
                .object_store_api_key
                .as_deref()
                .map(|value| !value.is_empty())
                .unwrap_or(false),
            "Initialized object store HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            bucket: config.bucket_name.clone(),
            api_key: config.object_store_api_key.clone(),
        })
    }

    /// Upload an object under the given key, overwriting any prior object.
    pub async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let size = bytes.len();
        let response = self
            .request(Method::PUT, key)
            .header("content-type", content_type)
            .body(bytes)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(bucket = %self.bucket, key, size, "Object uploaded");
        })
        .await
    }

    /// Probe the bucket to verify the store is reachable.
    pub async fn bucket_exists(&self) -> Result<bool, ObjectStoreError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), self.bucket);
        let mut request = self.client.head(url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            request = request.header("api-key", api_key);
        }
        let response = request.send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = ObjectStoreError::UnexpectedStatus { status, body };
                tracing::error!(bucket = %self.bucket, error = %error, "Bucket probe failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, key: &str) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.bucket,
            key.trim_start_matches('/')
        );
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), ObjectStoreError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = ObjectStoreError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Object store request failed");
            Err(error)
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}
