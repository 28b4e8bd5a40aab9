//! HTTP catalog client
//!
//! Talks to the storefront API (`GET /products/:id`, `GET /stock/:id`).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::{CatalogError, ProductCatalog};
use crate::config::CatalogConfig;
use crate::domain::{Product, ProductId, StockRecord};

/// reqwest-backed catalog client
pub struct HttpCatalog {
    base_url: String,
    http: Client,
    timeout: Duration,
}

impl HttpCatalog {
    /// Create a client for the API rooted at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(%base_url, ?timeout, "HttpCatalog::new: called");
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            http,
            timeout,
        })
    }

    /// Create a client from configuration
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        Self::new(config.base_url.clone(), Duration::from_millis(config.timeout_ms))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn product_url(&self, id: ProductId) -> String {
        format!("{}/products/{}", self.base_url, id)
    }

    fn stock_url(&self, id: ProductId) -> String {
        format!("{}/stock/{}", self.base_url, id)
    }

    async fn get_json<T: DeserializeOwned>(&self, id: ProductId, url: &str) -> Result<T, CatalogError> {
        debug!(%url, "get_json: called");
        let response = self.http.get(url).send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(%id, "get_json: 404");
            return Err(CatalogError::NotFound(id));
        }

        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        if !status.is_success() {
            debug!(%status, "get_json: API error");
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        parse_body(&text)
    }

    fn map_send_error(&self, err: reqwest::Error) -> CatalogError {
        if err.is_timeout() {
            CatalogError::Timeout(self.timeout)
        } else {
            CatalogError::Network(err)
        }
    }
}

fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, CatalogError> {
    serde_json::from_str(text).map_err(|e| CatalogError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl ProductCatalog for HttpCatalog {
    async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        let url = self.product_url(id);
        self.get_json(id, &url).await
    }

    async fn stock(&self, id: ProductId) -> Result<StockRecord, CatalogError> {
        let url = self.stock_url(id);
        let mut stock: StockRecord = self.get_json(id, &url).await?;
        stock.id = id;
        Ok(stock)
    }
}
