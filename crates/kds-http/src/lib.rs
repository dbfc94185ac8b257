//! KDS HTTP - reqwest client for the remote order service
//!
//! Implements `kds_core::KdsApi` over JSON (camelCase fields):
//! - `POST /orders`
//! - `PATCH /orders/{id}`
//! - `GET /orders?businessId=`
//! - `GET /performance?businessId=&start=&end=` (RFC 3339 instants)
//!
//! Each call is a single attempt. Timeouts are enforced by the client.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use async_trait::async_trait;
use kds_core::config::ApiConfig;
use kds_core::{
    ApiError, BusinessId, DateRange, KdsApi, KdsOrder, NewOrderRequest, OrderPatch,
    OrderRecordId, PerformanceSnapshot,
};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// `KdsApi` backed by HTTP
#[derive(Debug, Clone)]
pub struct HttpKdsApi {
    client: Client,
    base: Url,
}

impl HttpKdsApi {
    /// Build a client for `base_url` with a per-request `timeout`
    ///
    /// # Errors
    /// - `Transport` if the URL cannot serve as a base or the client fails to build
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base = Url::parse(base_url).map_err(ApiError::transport)?;
        if base.cannot_be_a_base() {
            return Err(ApiError::transport(format!("not a base url: {base_url}")));
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kds/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::transport)?;
        Ok(Self { client, base })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::transport(format!("not a base url: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let url = response.url().clone();
    let body = response.text().await.map_err(ApiError::transport)?;

    if !status.is_success() {
        tracing::warn!(%url, status = status.as_u16(), "request rejected");
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::warn!(%url, error = %e, "undecodable response");
        ApiError::Decode(e.to_string())
    })
}

#[async_trait]
impl KdsApi for HttpKdsApi {
    async fn create_order(&self, request: &NewOrderRequest) -> Result<KdsOrder, ApiError> {
        let url = self.endpoint(&["orders"])?;
        tracing::debug!(%url, order_token = %request.order_id, "POST order");
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(ApiError::transport)?;
        decode(response).await
    }

    async fn update_order(
        &self,
        id: &OrderRecordId,
        patch: &OrderPatch,
    ) -> Result<KdsOrder, ApiError> {
        let url = self.endpoint(&["orders", id.as_str()])?;
        tracing::debug!(%url, "PATCH order");
        let response = self
            .client
            .patch(url)
            .json(patch)
            .send()
            .await
            .map_err(ApiError::transport)?;
        decode(response).await
    }

    async fn list_orders(&self, business_id: &BusinessId) -> Result<Vec<KdsOrder>, ApiError> {
        let url = self.endpoint(&["orders"])?;
        tracing::debug!(%url, %business_id, "GET orders");
        let response = self
            .client
            .get(url)
            .query(&[("businessId", business_id.as_str())])
            .send()
            .await
            .map_err(ApiError::transport)?;
        decode(response).await
    }

    async fn fetch_performance(
        &self,
        business_id: &BusinessId,
        range: &DateRange,
    ) -> Result<PerformanceSnapshot, ApiError> {
        let url = self.endpoint(&["performance"])?;
        let start = range.start.to_rfc3339();
        let end = range.end.to_rfc3339();
        tracing::debug!(%url, %business_id, %start, %end, "GET performance");
        let response = self
            .client
            .get(url)
            .query(&[
                ("businessId", business_id.as_str()),
                ("start", start.as_str()),
                ("end", end.as_str()),
            ])
            .send()
            .await
            .map_err(ApiError::transport)?;
        decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_keep_base_path() {
        let api = HttpKdsApi::new("https://api.example.com/v1/", Duration::from_secs(1)).unwrap();
        let url = api.endpoint(&["orders", "ord 7"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/orders/ord%207");

        let bare = HttpKdsApi::new("http://localhost:8080", Duration::from_secs(1)).unwrap();
        assert_eq!(
            bare.endpoint(&["performance"]).unwrap().as_str(),
            "http://localhost:8080/performance"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(HttpKdsApi::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpKdsApi::new("mailto:kitchen@example.com", Duration::from_secs(1)).is_err());
    }
}
