//! HTTP client for the collection endpoints.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use thiserror::Error;

use crate::config::ClientConfig;
use crate::entity::{Entity, FieldValues};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: StatusCode, body: String },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("invalid server URL '{0}'")]
    Url(String),
}

/// What an entity store needs from a remote collection.
#[async_trait]
pub trait CollectionApi<E: Entity>: Send + Sync {
    async fn list(&self) -> Result<Vec<E>, ClientError>;
    async fn create(&self, values: &FieldValues) -> Result<E, ClientError>;
    async fn update(&self, id: &str, patch: &FieldValues) -> Result<E, ClientError>;
    async fn delete(&self, id: &str) -> Result<(), ClientError>;
}

/// `CollectionApi` over `<base_url>/api/<kind>s`.
pub struct HttpCollection<E> {
    http: reqwest::Client,
    base: String,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> HttpCollection<E> {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        HttpCollection {
            http,
            base: format!(
                "{}/api/{}",
                base_url.trim_end_matches('/'),
                E::KIND.collection()
            ),
            _entity: PhantomData,
        }
    }

    /// `<base>/<id>`, with the id percent-encoded as a single path segment.
    fn item_url(&self, id: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base).map_err(|_| ClientError::Url(self.base.clone()))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Url(self.base.clone()))?
            .push(id);
        Ok(url)
    }
}

/// Shared HTTP client honouring the configured timeout.
pub fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, ClientError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::Server { status, body })
}

async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let bytes = check(resp).await?.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

#[async_trait]
impl<E: Entity> CollectionApi<E> for HttpCollection<E> {
    async fn list(&self) -> Result<Vec<E>, ClientError> {
        decode(self.http.get(&self.base).send().await?).await
    }

    async fn create(&self, values: &FieldValues) -> Result<E, ClientError> {
        decode(self.http.post(&self.base).json(values).send().await?).await
    }

    async fn update(&self, id: &str, patch: &FieldValues) -> Result<E, ClientError> {
        decode(self.http.patch(self.item_url(id)?).json(patch).send().await?).await
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        check(self.http.delete(self.item_url(id)?).send().await?).await?;
        Ok(())
    }
}
