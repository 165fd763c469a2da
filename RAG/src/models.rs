use crate::error::ParameterError;
use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://your-api-url.here";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_K: u32 = 5;
pub const DEFAULT_CHUNK_OVERLAP: u32 = 10;
pub const DEFAULT_RERANK_K: u32 = 5;

/// Which index the service should search, with the rerank depth where it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSelection {
    Basic,
    Rerank { rerank_k: u32 },
}

impl IndexSelection {
    pub fn name(&self) -> &'static str {
        match self {
            IndexSelection::Basic => "basic",
            IndexSelection::Rerank { .. } => "rerank",
        }
    }

    pub fn rerank_k(&self) -> Option<u32> {
        match self {
            IndexSelection::Basic => None,
            IndexSelection::Rerank { rerank_k } => Some(*rerank_k),
        }
    }
}

/// Retrieval settings for one submission. Only constructible through
/// [`QueryParameters::new`] or the builder, so every instance is in range.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameters {
    base_url: String,
    temperature: f32,
    k: u32,
    chunk_overlap: u32,
    index: IndexSelection,
}

impl QueryParameters {
    pub fn new(
        base_url: &str,
        temperature: f32,
        k: u32,
        chunk_overlap: u32,
        index: IndexSelection,
    ) -> Result<Self, ParameterError> {
        let base_url = normalize_base_url(base_url)?;

        if !(0.0..=1.0).contains(&temperature) {
            return Err(ParameterError::Temperature(temperature));
        }
        if !(1..=20).contains(&k) {
            return Err(ParameterError::K(k));
        }
        if chunk_overlap > 50 {
            return Err(ParameterError::ChunkOverlap(chunk_overlap));
        }
        if let IndexSelection::Rerank { rerank_k } = index {
            if !(1..=20).contains(&rerank_k) {
                return Err(ParameterError::RerankK(rerank_k));
            }
        }

        Ok(Self {
            base_url,
            temperature,
            k,
            chunk_overlap,
            index,
        })
    }

    pub fn builder(base_url: impl Into<String>) -> QueryParametersBuilder {
        QueryParametersBuilder {
            base_url: base_url.into(),
            temperature: DEFAULT_TEMPERATURE,
            k: DEFAULT_K,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            index: IndexSelection::Basic,
        }
    }

    /// Base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn chunk_overlap(&self) -> u32 {
        self.chunk_overlap
    }

    pub fn index(&self) -> IndexSelection {
        self.index
    }

    pub fn to_request(&self) -> SetParametersRequest {
        SetParametersRequest {
            temperature: self.temperature,
            k: self.k,
            chunk_overlap: self.chunk_overlap,
            rerank_k: self.index.rerank_k(),
            index_type: self.index.name().to_string(),
        }
    }
}

pub struct QueryParametersBuilder {
    base_url: String,
    temperature: f32,
    k: u32,
    chunk_overlap: u32,
    index: IndexSelection,
}

impl QueryParametersBuilder {
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn k(mut self, k: u32) -> Self {
        self.k = k;
        self
    }

    pub fn chunk_overlap(mut self, chunk_overlap: u32) -> Self {
        self.chunk_overlap = chunk_overlap;
        self
    }

    pub fn index(mut self, index: IndexSelection) -> Self {
        self.index = index;
        self
    }

    pub fn build(self) -> Result<QueryParameters, ParameterError> {
        QueryParameters::new(
            &self.base_url,
            self.temperature,
            self.k,
            self.chunk_overlap,
            self.index,
        )
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ParameterError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| ParameterError::BaseUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }

    Ok(trimmed.to_string())
}

/// Keywords typed as a comma-separated list, blanks removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualKeywords(Vec<String>);

impl ManualKeywords {
    pub fn parse(input: &str) -> Self {
        Self(
            input
                .split(',')
                .map(str::trim)
                .filter(|kw| !kw.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub query_text: String,
    pub history_context_limit: Option<u32>,
}

impl QueryRequest {
    /// A limit of zero means "no history", same as `None`.
    pub fn new(
        query_text: impl Into<String>,
        history_limit: Option<u32>,
    ) -> Result<Self, ParameterError> {
        let history_context_limit = match history_limit {
            None | Some(0) => None,
            Some(limit) if limit <= 10 => Some(limit),
            Some(limit) => return Err(ParameterError::HistoryLimit(limit)),
        };

        Ok(Self {
            query_text: query_text.into(),
            history_context_limit,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AddKeywordsRequest<'a> {
    pub keywords: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetParametersRequest {
    pub temperature: f32,
    pub k: u32,
    pub chunk_overlap: u32,
    pub rerank_k: Option<u32>,
    pub index_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RetrievedDocument {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub content_preview: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub retrieved_documents: Vec<RetrievedDocument>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_trimmed_and_blanks_dropped() {
        let keywords = ManualKeywords::parse(" a, ,b ,");
        assert_eq!(keywords.as_slice(), ["a".to_string(), "b".to_string()]);
        assert!(ManualKeywords::parse("").is_empty());
        assert!(ManualKeywords::parse(" , ,").is_empty());
    }

    #[test]
    fn base_url_loses_trailing_slashes() {
        let params = QueryParameters::builder("http://localhost:8000//")
            .build()
            .unwrap();
        assert_eq!(params.base_url(), "http://localhost:8000");
    }

    #[test]
    fn rejects_bad_base_urls() {
        assert!(matches!(
            QueryParameters::builder("not a url").build(),
            Err(ParameterError::BaseUrl { .. })
        ));
        assert!(matches!(
            QueryParameters::builder("ftp://example.com").build(),
            Err(ParameterError::BaseUrl { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let base = "http://localhost:8000";
        assert_eq!(
            QueryParameters::builder(base).temperature(1.5).build(),
            Err(ParameterError::Temperature(1.5))
        );
        assert_eq!(
            QueryParameters::builder(base).k(0).build(),
            Err(ParameterError::K(0))
        );
        assert_eq!(
            QueryParameters::builder(base).k(21).build(),
            Err(ParameterError::K(21))
        );
        assert_eq!(
            QueryParameters::builder(base).chunk_overlap(51).build(),
            Err(ParameterError::ChunkOverlap(51))
        );
        assert_eq!(
            QueryParameters::builder(base)
                .index(IndexSelection::Rerank { rerank_k: 0 })
                .build(),
            Err(ParameterError::RerankK(0))
        );
    }

    #[test]
    fn set_parameters_body_matches_the_wire_format() {
        let basic = QueryParameters::builder("http://localhost:8000")
            .build()
            .unwrap();
        let body = serde_json::to_value(basic.to_request()).unwrap();
        assert_eq!(body["k"], 5);
        assert_eq!(body["chunk_overlap"], 10);
        assert_eq!(body["index_type"], "basic");
        assert!(body["rerank_k"].is_null());

        let rerank = QueryParameters::builder("http://localhost:8000")
            .index(IndexSelection::Rerank { rerank_k: 7 })
            .build()
            .unwrap();
        let body = serde_json::to_value(rerank.to_request()).unwrap();
        assert_eq!(body["index_type"], "rerank");
        assert_eq!(body["rerank_k"], 7);
    }

    #[test]
    fn zero_history_limit_means_no_history() {
        assert_eq!(
            QueryRequest::new("q", Some(0)).unwrap().history_context_limit,
            None
        );
        assert_eq!(
            QueryRequest::new("q", Some(3)).unwrap().history_context_limit,
            Some(3)
        );
        assert_eq!(
            QueryRequest::new("q", Some(11)),
            Err(ParameterError::HistoryLimit(11))
        );
    }

    #[test]
    fn missing_response_fields_deserialize_as_none() {
        let result: QueryResult =
            serde_json::from_str(r#"{"retrieved_documents": [{"content_preview": "abc"}]}"#)
                .unwrap();
        assert_eq!(result.answer, None);
        assert_eq!(result.retrieved_documents[0].source, None);

        let empty: QueryResult = serde_json::from_str("{}").unwrap();
        assert!(empty.retrieved_documents.is_empty());

        let null_docs: QueryResult =
            serde_json::from_str(r#"{"answer": "x", "retrieved_documents": null}"#).unwrap();
        assert!(null_docs.retrieved_documents.is_empty());
    }
}
