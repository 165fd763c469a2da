use crate::error::StageError;
use crate::models::*;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Typed calls against one RAG service. Every call takes its own timeout.
pub struct RagApiClient {
    client: Client,
    base_url: String,
}

impl RagApiClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self, timeout: Duration) -> Result<Value, StageError> {
        let request = self.client.get(format!("{}/health", self.base_url));
        let response = send(request, timeout).await?;
        opaque_json(response, timeout).await
    }

    pub async fn add_keywords(
        &self,
        keywords: &[String],
        timeout: Duration,
    ) -> Result<Value, StageError> {
        let request = self
            .client
            .post(format!("{}/add-keywords", self.base_url))
            .json(&AddKeywordsRequest { keywords });
        let response = send(request, timeout).await?;
        opaque_json(response, timeout).await
    }

    pub async fn set_parameters(
        &self,
        body: &SetParametersRequest,
        timeout: Duration,
    ) -> Result<Value, StageError> {
        let request = self
            .client
            .post(format!("{}/set-parameters", self.base_url))
            .json(body);
        let response = send(request, timeout).await?;
        opaque_json(response, timeout).await
    }

    pub async fn query_with_details(
        &self,
        query: &QueryRequest,
        timeout: Duration,
    ) -> Result<QueryResult, StageError> {
        let mut params = vec![("query", query.query_text.clone())];
        if let Some(limit) = query.history_context_limit {
            params.push(("history_context_limit", limit.to_string()));
        }

        let request = self
            .client
            .post(format!("{}/query-with-details", self.base_url))
            .query(&params);
        let response = send(request, timeout).await?;
        typed_json(response, timeout).await
    }

    pub async fn conversation_history(
        &self,
        limit: u32,
        timeout: Duration,
    ) -> Result<Vec<HistoryEntry>, StageError> {
        let request = self
            .client
            .get(format!("{}/conversation-history", self.base_url))
            .query(&[("limit", limit)]);
        let response = send(request, timeout).await?;
        typed_json(response, timeout).await
    }
}

async fn send(request: RequestBuilder, timeout: Duration) -> Result<Response, StageError> {
    let response = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| StageError::from_reqwest(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StageError::Status { status, body });
    }

    Ok(response)
}

/// Bodies nobody renders: anything that is not JSON is kept as `Null`.
async fn opaque_json(response: Response, timeout: Duration) -> Result<Value, StageError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| StageError::from_reqwest(e, timeout))?;

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(value),
        Err(e) => {
            log::debug!("Ignoring non-JSON response body ({} bytes): {}", bytes.len(), e);
            Ok(Value::Null)
        }
    }
}

async fn typed_json<T: DeserializeOwned>(
    response: Response,
    timeout: Duration,
) -> Result<T, StageError> {
    response
        .json::<T>()
        .await
        .map_err(|e| StageError::from_reqwest(e, timeout))
}
