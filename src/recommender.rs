//! Client for the external movie recommendation service.
//!
//! After a successful login the user's id is posted to the service and
//! whatever JSON it answers with is handed to the client untouched.

use cinestream_common::{Error, Result, UserId};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::RecommenderConfig;

const SERVICE: &str = "recommender";

#[derive(Serialize)]
struct RecommendRequest {
    user_id: UserId,
}

/// HTTP client for `POST <url> {"user_id": ...}`.
#[derive(Clone)]
pub struct RecommenderClient {
    client: Client,
    url: String,
}

impl RecommenderClient {
    /// Build a client, or `None` when no service URL is configured.
    pub fn from_config(config: &RecommenderConfig) -> Option<Self> {
        let url = config.url.as_ref()?.trim().to_string();
        if url.is_empty() {
            return None;
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Some(Self { client, url })
    }

    /// Ask for recommendations for `user_id`.
    pub async fn recommend(&self, user_id: UserId) -> Result<Value> {
        let response = self
            .client
            .post(&self.url)
            .json(&RecommendRequest { user_id })
            .send()
            .await
            .map_err(|e| Error::upstream(SERVICE, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(SERVICE, format!("{status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| Error::upstream(SERVICE, format!("invalid response body: {e}")))
    }

    /// Recommendations for `user_id`, or an empty list when the service
    /// cannot be reached or answers with an error.
    pub async fn recommend_or_empty(&self, user_id: UserId) -> Value {
        match self.recommend(user_id).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Recommendation service failed");
                Value::Array(Vec::new())
            }
        }
    }
}
