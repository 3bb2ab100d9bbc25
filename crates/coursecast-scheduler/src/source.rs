//! Feed client: one POST, one JSON array of items.

use async_trait::async_trait;
use coursecast_core::error::{CastError, Result};
use coursecast_core::traits::ItemSource;
use coursecast_core::types::BroadcastItem;

pub struct HttpItemSource {
    client: reqwest::Client,
    url: String,
}

impl HttpItemSource {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl ItemSource for HttpItemSource {
    async fn fetch_batch(&self) -> Result<Vec<BroadcastItem>> {
        let response = self
            .client
            .post(&self.url)
            .send()
            .await
            .map_err(|e| CastError::fetch(format!("feed request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CastError::fetch(format!(
                "feed returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CastError::fetch(format!("feed body unreadable: {e}")))?;

        // A non-array body is a protocol violation, never coerced.
        let Some(entries) = body.as_array() else {
            return Err(CastError::Protocol(format!(
                "feed returned a non-array response: {}",
                kind_of(&body)
            )));
        };

        entries
            .iter()
            .map(|entry| {
                serde_json::from_value(entry.clone())
                    .map_err(|e| CastError::Protocol(format!("malformed feed item: {e}")))
            })
            .collect()
    }
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
