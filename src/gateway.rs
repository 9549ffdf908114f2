use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned status {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },
    #[error("response from {url} is not a JSON array")]
    Shape { url: String },
}

/// Remote API surface the mirror runs against. Implementations carry their
/// authentication; callers only ever pass resource URLs and JSON bodies.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// One GET of a collection resource, its JSON array streamed element by
    /// element. The page request is the only await point; a transport or
    /// status failure surfaces as a single `Err` element.
    fn fetch_collection(&self, url: &str) -> BoxStream<'static, Result<Value, GatewayError>>;

    async fn create(&self, url: &str, body: &Value) -> Result<Value, GatewayError>;

    async fn update(&self, url: &str, body: &Value) -> Result<Value, GatewayError>;

    async fn delete(&self, url: &str) -> Result<(), GatewayError>;
}

#[derive(Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
}

impl HttpGateway {
    pub fn new(config: &Config) -> Result<Self> {
        let mut token = HeaderValue::from_str(config.auth.token.expose_secret())
            .map_err(|_| anyhow!("auth token contains characters not allowed in a header"))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, token);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.api.request_timeout))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    fn fetch_collection(&self, url: &str) -> BoxStream<'static, Result<Value, GatewayError>> {
        let http = self.http.clone();
        let url = url.to_string();
        let page = async move {
            match fetch_page(&http, &url).await {
                Ok(elements) => stream::iter(elements.into_iter().map(Ok)).left_stream(),
                Err(err) => stream::once(async move { Err(err) }).right_stream(),
            }
        };
        stream::once(page).flatten().boxed()
    }

    async fn create(&self, url: &str, body: &Value) -> Result<Value, GatewayError> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| transport(url, err))?;
        let response = check_status(url, response).await?;
        response.json().await.map_err(|err| transport(url, err))
    }

    async fn update(&self, url: &str, body: &Value) -> Result<Value, GatewayError> {
        let response = self
            .http
            .patch(url)
            .json(body)
            .send()
            .await
            .map_err(|err| transport(url, err))?;
        let response = check_status(url, response).await?;
        response.json().await.map_err(|err| transport(url, err))
    }

    async fn delete(&self, url: &str) -> Result<(), GatewayError> {
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|err| transport(url, err))?;
        check_status(url, response).await?;
        Ok(())
    }
}

async fn fetch_page(http: &reqwest::Client, url: &str) -> Result<Vec<Value>, GatewayError> {
    debug!("fetching collection {url}");
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|err| transport(url, err))?;
    let response = check_status(url, response).await?;
    let body: Value = response.json().await.map_err(|err| transport(url, err))?;
    match body {
        Value::Array(elements) => Ok(elements),
        _ => Err(GatewayError::Shape {
            url: url.to_string(),
        }),
    }
}

async fn check_status(
    url: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(GatewayError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        message,
    })
}

fn transport(url: &str, source: reqwest::Error) -> GatewayError {
    GatewayError::Transport {
        url: url.to_string(),
        source,
    }
}
