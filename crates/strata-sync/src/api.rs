//! Remote REST API boundary.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::ApiConfig;
use strata_store::Collection;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {message}")]
    RequestFailed { message: String },

    #[error("Unexpected status: {status}")]
    Status { status: u16 },

    #[error("Parse error: {message}")]
    ParseError { message: String },
}

/// The mutation and collection endpoints the sync layer consumes.
///
/// A trait so tests (and other frontends) can substitute a fake for the
/// HTTP client. Every call carries the caller's current bearer token; the
/// engine owns the token, not the client.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// `POST /{collection}`. Returns the server-confirmed record, with the
    /// canonical identifier.
    async fn create(&self, entity: Collection, body: &Value, token: &str)
        -> Result<Value, ApiError>;

    /// `PUT /{collection}/{id}`.
    async fn update(
        &self,
        entity: Collection,
        id: &str,
        body: &Value,
        token: &str,
    ) -> Result<Value, ApiError>;

    /// `DELETE /{collection}/{id}`.
    async fn delete(&self, entity: Collection, id: &str, token: &str) -> Result<(), ApiError>;

    /// `GET /{collection}`. Implementations unwrap the response envelope:
    /// list endpoints return either a bare array or `{data: [...],
    /// pagination: ...}`.
    async fn fetch_all(&self, entity: Collection, token: &str) -> Result<Vec<Value>, ApiError>;
}

/// reqwest-backed implementation of the API boundary.
pub struct HttpRemoteApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteApi {
    pub fn new(config: &ApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.clone(),
        }
    }

    fn collection_url(&self, entity: Collection) -> String {
        format!("{}/{}", self.base_url, entity.as_str())
    }

    fn record_url(&self, entity: Collection, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, entity.as_str(), id)
    }

    async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let response = check_status(request).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::ParseError {
                message: e.to_string(),
            })
    }
}

async fn check_status(request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
    let response = request
        .send()
        .await
        .map_err(|e| ApiError::RequestFailed {
            message: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
        });
    }
    Ok(response)
}

/// Unwrap a list response: bare array, or an object with a `data` array
/// and a `pagination` sibling.
pub fn unwrap_list(value: Value) -> Result<Vec<Value>, ApiError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ApiError::ParseError {
                message: "expected a list or an object with a `data` array".to_string(),
            }),
        },
        _ => Err(ApiError::ParseError {
            message: "expected a list response".to_string(),
        }),
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn create(
        &self,
        entity: Collection,
        body: &Value,
        token: &str,
    ) -> Result<Value, ApiError> {
        self.send_json(
            self.client
                .post(self.collection_url(entity))
                .bearer_auth(token)
                .json(body),
        )
        .await
    }

    async fn update(
        &self,
        entity: Collection,
        id: &str,
        body: &Value,
        token: &str,
    ) -> Result<Value, ApiError> {
        self.send_json(
            self.client
                .put(self.record_url(entity, id))
                .bearer_auth(token)
                .json(body),
        )
        .await
    }

    async fn delete(&self, entity: Collection, id: &str, token: &str) -> Result<(), ApiError> {
        check_status(
            self.client
                .delete(self.record_url(entity, id))
                .bearer_auth(token),
        )
        .await?;
        Ok(())
    }

    async fn fetch_all(&self, entity: Collection, token: &str) -> Result<Vec<Value>, ApiError> {
        let value = self
            .send_json(self.client.get(self.collection_url(entity)).bearer_auth(token))
            .await?;
        unwrap_list(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwrap_list_accepts_bare_array() {
        let items = unwrap_list(json!([{"id": "b-1"}, {"id": "b-2"}])).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn unwrap_list_accepts_data_envelope() {
        let items = unwrap_list(json!({
            "data": [{"id": "b-1"}],
            "pagination": {"page": 1, "total": 1}
        }))
        .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "b-1");
    }

    #[test]
    fn unwrap_list_rejects_other_shapes() {
        assert!(unwrap_list(json!({"items": []})).is_err());
        assert!(unwrap_list(json!("nope")).is_err());
    }

    #[test]
    fn urls_follow_collection_routes() {
        let api = HttpRemoteApi::new(&ApiConfig {
            base_url: "https://api.strata.example/v1".into(),
        });
        assert_eq!(
            api.collection_url(Collection::Buildings),
            "https://api.strata.example/v1/buildings"
        );
        assert_eq!(
            api.record_url(Collection::Owners, "o-1"),
            "https://api.strata.example/v1/owners/o-1"
        );
    }
}
