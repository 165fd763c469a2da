use crate::config::StageTimeouts;
use crate::error::StageError;
use crate::models::*;
use crate::pipeline::{AttemptState, PipelinePlan, PipelineState, Stage, TimeoutEscalation};
use crate::rag_api::RagApiClient;
use crate::render::{self, Reporter};
use reqwest::Client;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug)]
pub struct StageRecord {
    pub stage: Stage,
    pub outcome: Result<(), StageError>,
    /// Calls issued for this stage; 2 when the parameter call was retried.
    pub attempts: u32,
    pub elapsed: Duration,
}

/// What happened during one run. Failures have already been reported by the
/// time this is returned.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub stages: Vec<StageRecord>,
    pub state: PipelineState,
    pub query_result: Option<QueryResult>,
    pub history: Option<Vec<HistoryEntry>>,
}

impl RunSummary {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            stages: Vec::new(),
            state: PipelineState::Completed,
            query_result: None,
            history: None,
        }
    }

    pub fn aborted(&self) -> bool {
        matches!(self.state, PipelineState::Aborted { .. })
    }

    pub fn executed(&self) -> Vec<Stage> {
        self.stages.iter().map(|record| record.stage).collect()
    }

    pub fn record(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.iter().find(|record| record.stage == stage)
    }
}

pub struct QueryOrchestrator {
    client: Client,
    timeouts: StageTimeouts,
}

impl QueryOrchestrator {
    pub fn new(timeouts: StageTimeouts) -> Self {
        Self::with_client(Client::new(), timeouts)
    }

    pub fn with_client(client: Client, timeouts: StageTimeouts) -> Self {
        Self { client, timeouts }
    }

    /// Health check, keywords, parameters, query, then history.
    pub async fn run_query(
        &self,
        parameters: &QueryParameters,
        keywords: &ManualKeywords,
        request: &QueryRequest,
        reporter: &mut dyn Reporter,
    ) -> RunSummary {
        let plan = PipelinePlan::for_query(keywords, request);
        self.run(plan, parameters, reporter).await
    }

    /// Health check and parameter configuration, nothing else.
    pub async fn submit_parameters(
        &self,
        parameters: &QueryParameters,
        reporter: &mut dyn Reporter,
    ) -> RunSummary {
        let summary = self
            .run(PipelinePlan::configure_only(), parameters, reporter)
            .await;
        if !summary.aborted() {
            reporter.success("Parameters successfully submitted!");
        }
        summary
    }

    async fn run(
        &self,
        plan: PipelinePlan<'_>,
        parameters: &QueryParameters,
        reporter: &mut dyn Reporter,
    ) -> RunSummary {
        let api = RagApiClient::new(self.client.clone(), parameters.base_url());
        let mut summary = RunSummary::new(Uuid::new_v4());
        log::info!(
            "[{}] Starting run against {} ({} stages planned)",
            summary.run_id,
            api.base_url(),
            plan.stages().len()
        );

        let mut state = plan.start();
        while let PipelineState::Running(stage) = state {
            let started = Instant::now();
            let (outcome, attempts) = self
                .execute(stage, &plan, &api, parameters, reporter, &mut summary)
                .await;
            let elapsed = started.elapsed();

            match &outcome {
                Ok(()) => log::info!("[{}] {} succeeded in {:?}", summary.run_id, stage, elapsed),
                Err(e) => log::warn!("[{}] {} failed after {:?}: {}", summary.run_id, stage, elapsed, e),
            }

            state = plan.advance(stage, outcome.is_ok());
            summary.stages.push(StageRecord {
                stage,
                outcome,
                attempts,
                elapsed,
            });
        }

        if let PipelineState::Aborted { at } = state {
            log::warn!("[{}] Run aborted at {}", summary.run_id, at);
        }
        summary.state = state;
        summary
    }

    async fn execute(
        &self,
        stage: Stage,
        plan: &PipelinePlan<'_>,
        api: &RagApiClient,
        parameters: &QueryParameters,
        reporter: &mut dyn Reporter,
        summary: &mut RunSummary,
    ) -> (Result<(), StageError>, u32) {
        match stage {
            Stage::HealthCheck => (self.check_health(api, reporter).await, 1),
            Stage::KeywordRegistration => {
                (self.register_keywords(api, plan.keywords(), reporter).await, 1)
            }
            Stage::ParameterConfiguration => self.configure(api, parameters, reporter).await,
            Stage::QueryExecution => {
                // Only scheduled when the plan carries a query.
                let Some(request) = plan.query() else {
                    return (Ok(()), 0);
                };
                let outcome = self.execute_query(api, request, reporter).await;
                (outcome.map(|result| summary.query_result = Some(result)), 1)
            }
            Stage::HistoryRetrieval => {
                let Some(limit) = plan.history_limit() else {
                    return (Ok(()), 0);
                };
                let outcome = self.fetch_history(api, limit, reporter).await;
                (outcome.map(|entries| summary.history = Some(entries)), 1)
            }
        }
    }

    async fn check_health(
        &self,
        api: &RagApiClient,
        reporter: &mut dyn Reporter,
    ) -> Result<(), StageError> {
        reporter.progress(&format!("Checking API health at {}...", api.base_url()));

        match api.health(self.timeouts.health).await {
            Ok(status) => {
                log::debug!("Health response: {}", status);
                reporter.success("API is healthy");
                Ok(())
            }
            Err(e) => {
                reporter.failure(&format!("API Health Check failed: {}", e));
                Err(e)
            }
        }
    }

    async fn register_keywords(
        &self,
        api: &RagApiClient,
        keywords: &[String],
        reporter: &mut dyn Reporter,
    ) -> Result<(), StageError> {
        reporter.progress(&format!("Adding {} manual keyword(s)...", keywords.len()));

        match api.add_keywords(keywords, self.timeouts.keywords).await {
            Ok(response) => {
                log::debug!("Add-keywords response: {}", response);
                reporter.success(&format!("Keywords added: {}", keywords.join(", ")));
                Ok(())
            }
            Err(e) => {
                reporter.failure(&format!("Failed to add keywords: {}", e));
                Err(e)
            }
        }
    }

    async fn configure(
        &self,
        api: &RagApiClient,
        parameters: &QueryParameters,
        reporter: &mut dyn Reporter,
    ) -> (Result<(), StageError>, u32) {
        let body = parameters.to_request();
        let policy =
            TimeoutEscalation::new(self.timeouts.parameters, self.timeouts.parameters_retry);

        reporter.progress(&format!(
            "Setting parameters (temperature {}, k {}, chunk overlap {}, index {})...",
            body.temperature, body.k, body.chunk_overlap, body.index_type
        ));

        let mut state = policy.start();
        let mut attempts = 0;
        let mut last_error = None;

        while let Some(timeout) = state.timeout() {
            attempts += 1;
            match api.set_parameters(&body, timeout).await {
                Ok(response) => {
                    log::debug!("Set-parameters response: {}", response);
                    state = policy.on_success(state);
                }
                Err(e) => {
                    state = policy.on_failure(state, &e);
                    if let AttemptState::Retrying(next) = state {
                        reporter.progress(&format!(
                            "Setting parameters timed out after {}s, retrying with a {}s timeout...",
                            timeout.as_secs_f32(),
                            next.as_secs_f32()
                        ));
                    }
                    last_error = Some(e);
                }
            }
        }

        match (state, last_error) {
            (AttemptState::Failed, Some(e)) => {
                reporter.failure(&format!("Failed to set parameters: {}", e));
                (Err(e), attempts)
            }
            _ => {
                reporter.success("Parameters set");
                (Ok(()), attempts)
            }
        }
    }

    async fn execute_query(
        &self,
        api: &RagApiClient,
        request: &QueryRequest,
        reporter: &mut dyn Reporter,
    ) -> Result<QueryResult, StageError> {
        reporter.progress("Executing query...");

        match api.query_with_details(request, self.timeouts.query).await {
            Ok(result) => {
                reporter.success("Query completed");
                reporter.block("Query Response", &render::render_answer(&result));
                reporter.block("Retrieved Documents", &render::render_documents(&result));
                Ok(result)
            }
            Err(e) => {
                reporter.failure(&format!("Query failed: {}", e));
                Err(e)
            }
        }
    }

    async fn fetch_history(
        &self,
        api: &RagApiClient,
        limit: u32,
        reporter: &mut dyn Reporter,
    ) -> Result<Vec<HistoryEntry>, StageError> {
        reporter.progress(&format!(
            "Retrieving conversation history (limit {})...",
            limit
        ));

        match api.conversation_history(limit, self.timeouts.history).await {
            Ok(entries) => {
                reporter.success(&format!("Retrieved {} history entries", entries.len()));
                if !entries.is_empty() {
                    reporter.block("Conversation History", &render::render_history(&entries));
                }
                Ok(entries)
            }
            Err(e) => {
                reporter.failure(&format!("Failed to retrieve conversation history: {}", e));
                Err(e)
            }
        }
    }
}
