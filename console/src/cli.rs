use clap::{Args, Parser, Subcommand, ValueEnum};
use rag_client::models::{DEFAULT_CHUNK_OVERLAP, DEFAULT_K, DEFAULT_RERANK_K, DEFAULT_TEMPERATURE};
use rag_client::{
    IndexSelection, ManualKeywords, ParameterError, QueryParameters, QueryRequest,
};

/// Query a RAG service: health check, keywords, parameters, query and history.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub retrieval: RetrievalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct RetrievalArgs {
    /// Base URL of the RAG service [default: $RAG_BASE_URL or the placeholder URL]
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Sampling temperature (0.0 - 1.0)
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE, global = true)]
    pub temperature: f32,

    /// Documents to retrieve (1 - 20)
    #[arg(short, long, default_value_t = DEFAULT_K, global = true)]
    pub k: u32,

    /// Chunk overlap (0 - 50)
    #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP, global = true)]
    pub chunk_overlap: u32,

    #[arg(long, value_enum, default_value_t = IndexType::Basic, global = true)]
    pub index_type: IndexType,

    /// Rerank depth (1 - 20), only sent with --index-type rerank
    #[arg(long, default_value_t = DEFAULT_RERANK_K, global = true)]
    pub rerank_k: u32,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexType {
    Basic,
    Rerank,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full pipeline for one query
    Query(QueryArgs),
    /// Check health and submit the retrieval parameters only
    Configure,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// The question to ask
    pub query: String,

    /// Manual keywords, comma-separated
    #[arg(long, default_value = "")]
    pub keywords: String,

    /// Also fetch the conversation history
    #[arg(long, default_value_t = false)]
    pub show_history: bool,

    /// History entries to fetch and use as context (1 - 10)
    #[arg(long, default_value_t = 1)]
    pub history_limit: u32,
}

impl RetrievalArgs {
    /// `default_base_url` is used when `--base-url` was not given.
    pub fn parameters(&self, default_base_url: &str) -> Result<QueryParameters, ParameterError> {
        let index = match self.index_type {
            IndexType::Basic => IndexSelection::Basic,
            IndexType::Rerank => IndexSelection::Rerank {
                rerank_k: self.rerank_k,
            },
        };

        QueryParameters::new(
            self.base_url.as_deref().unwrap_or(default_base_url),
            self.temperature,
            self.k,
            self.chunk_overlap,
            index,
        )
    }
}

impl QueryArgs {
    pub fn keywords(&self) -> ManualKeywords {
        ManualKeywords::parse(&self.keywords)
    }

    pub fn request(&self) -> Result<QueryRequest, ParameterError> {
        let limit = self.show_history.then_some(self.history_limit);
        if let Some(limit) = limit {
            if limit == 0 {
                return Err(ParameterError::HistoryLimit(limit));
            }
        }
        QueryRequest::new(self.query.clone(), limit)
    }
}
