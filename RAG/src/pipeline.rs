//! Stage ordering for one orchestration run.
//!
//! The run is a fixed sequence of [`Stage`]s. A [`PipelinePlan`] decides which
//! of them are eligible for a given submission and how the run moves on after
//! each outcome. None of this touches the network.

use crate::error::StageError;
use crate::models::{ManualKeywords, QueryRequest};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    HealthCheck,
    KeywordRegistration,
    ParameterConfiguration,
    QueryExecution,
    HistoryRetrieval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Failure ends the run.
    Fatal,
    /// Failure is reported and the run moves on.
    NonFatal,
}

impl Stage {
    pub const ORDER: [Stage; 5] = [
        Stage::HealthCheck,
        Stage::KeywordRegistration,
        Stage::ParameterConfiguration,
        Stage::QueryExecution,
        Stage::HistoryRetrieval,
    ];

    pub fn severity(self) -> Severity {
        match self {
            Stage::HealthCheck | Stage::ParameterConfiguration => Severity::Fatal,
            Stage::KeywordRegistration | Stage::QueryExecution | Stage::HistoryRetrieval => {
                Severity::NonFatal
            }
        }
    }

    fn position(self) -> usize {
        match self {
            Stage::HealthCheck => 0,
            Stage::KeywordRegistration => 1,
            Stage::ParameterConfiguration => 2,
            Stage::QueryExecution => 3,
            Stage::HistoryRetrieval => 4,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::HealthCheck => "health check",
            Stage::KeywordRegistration => "keyword registration",
            Stage::ParameterConfiguration => "parameter configuration",
            Stage::QueryExecution => "query execution",
            Stage::HistoryRetrieval => "history retrieval",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Running(Stage),
    Completed,
    Aborted { at: Stage },
}

/// Which stages a submission needs, plus the inputs those stages read.
#[derive(Debug, Clone, Copy)]
pub struct PipelinePlan<'a> {
    keywords: &'a [String],
    query: Option<&'a QueryRequest>,
}

impl<'a> PipelinePlan<'a> {
    pub fn for_query(keywords: &'a ManualKeywords, query: &'a QueryRequest) -> Self {
        Self {
            keywords: keywords.as_slice(),
            query: Some(query),
        }
    }

    /// Health check and parameter configuration only.
    pub fn configure_only() -> PipelinePlan<'static> {
        PipelinePlan {
            keywords: &[],
            query: None,
        }
    }

    pub fn keywords(&self) -> &'a [String] {
        self.keywords
    }

    pub fn query(&self) -> Option<&'a QueryRequest> {
        self.query
    }

    pub fn history_limit(&self) -> Option<u32> {
        self.query.and_then(|q| q.history_context_limit)
    }

    pub fn is_eligible(&self, stage: Stage) -> bool {
        match stage {
            Stage::HealthCheck | Stage::ParameterConfiguration => true,
            Stage::KeywordRegistration => !self.keywords.is_empty(),
            Stage::QueryExecution => self.query.is_some(),
            Stage::HistoryRetrieval => self.history_limit().is_some(),
        }
    }

    pub fn start(&self) -> PipelineState {
        self.next_after(None)
    }

    /// Transition taken once `stage` has finished.
    pub fn advance(&self, stage: Stage, succeeded: bool) -> PipelineState {
        if !succeeded && stage.severity() == Severity::Fatal {
            return PipelineState::Aborted { at: stage };
        }
        self.next_after(Some(stage))
    }

    fn next_after(&self, current: Option<Stage>) -> PipelineState {
        let from = current.map_or(0, |stage| stage.position() + 1);
        Stage::ORDER[from..]
            .iter()
            .copied()
            .find(|stage| self.is_eligible(*stage))
            .map_or(PipelineState::Completed, PipelineState::Running)
    }

    /// Eligible stages in run order, assuming every call succeeds.
    pub fn stages(&self) -> Vec<Stage> {
        Stage::ORDER
            .iter()
            .copied()
            .filter(|stage| self.is_eligible(*stage))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Attempting(Duration),
    Retrying(Duration),
    Succeeded,
    Failed,
}

impl AttemptState {
    /// Timeout for the next call, or `None` once the stage has settled.
    pub fn timeout(self) -> Option<Duration> {
        match self {
            AttemptState::Attempting(t) | AttemptState::Retrying(t) => Some(t),
            AttemptState::Succeeded | AttemptState::Failed => None,
        }
    }
}

/// One retry, only after a timeout, with a longer limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutEscalation {
    first: Duration,
    retry: Duration,
}

impl TimeoutEscalation {
    pub fn new(first: Duration, retry: Duration) -> Self {
        Self { first, retry }
    }

    pub fn start(&self) -> AttemptState {
        AttemptState::Attempting(self.first)
    }

    pub fn on_success(&self, _state: AttemptState) -> AttemptState {
        AttemptState::Succeeded
    }

    pub fn on_failure(&self, state: AttemptState, err: &StageError) -> AttemptState {
        match state {
            AttemptState::Attempting(_) if err.is_timeout() => AttemptState::Retrying(self.retry),
            _ => AttemptState::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn keywords(input: &str) -> ManualKeywords {
        ManualKeywords::parse(input)
    }

    fn request(limit: Option<u32>) -> QueryRequest {
        QueryRequest::new("what is covered?", limit).unwrap()
    }

    #[test]
    fn full_plan_runs_every_stage_in_order() {
        let (kw, req) = (keywords("a,b"), request(Some(3)));
        let plan = PipelinePlan::for_query(&kw, &req);
        assert_eq!(plan.stages(), Stage::ORDER.to_vec());
        assert_eq!(plan.start(), PipelineState::Running(Stage::HealthCheck));
    }

    #[test]
    fn empty_keywords_and_no_history_skip_their_stages() {
        let (kw, req) = (keywords(" , "), request(None));
        let plan = PipelinePlan::for_query(&kw, &req);
        assert_eq!(
            plan.stages(),
            vec![
                Stage::HealthCheck,
                Stage::ParameterConfiguration,
                Stage::QueryExecution
            ]
        );
        assert_eq!(
            plan.advance(Stage::HealthCheck, true),
            PipelineState::Running(Stage::ParameterConfiguration)
        );
        assert_eq!(
            plan.advance(Stage::QueryExecution, true),
            PipelineState::Completed
        );
    }

    #[test]
    fn zero_history_limit_is_not_eligible() {
        let (kw, req) = (keywords(""), request(Some(0)));
        let plan = PipelinePlan::for_query(&kw, &req);
        assert!(!plan.is_eligible(Stage::HistoryRetrieval));
    }

    #[test]
    fn fatal_stages_abort_on_failure() {
        let (kw, req) = (keywords("a"), request(Some(2)));
        let plan = PipelinePlan::for_query(&kw, &req);
        assert_eq!(
            plan.advance(Stage::HealthCheck, false),
            PipelineState::Aborted {
                at: Stage::HealthCheck
            }
        );
        assert_eq!(
            plan.advance(Stage::ParameterConfiguration, false),
            PipelineState::Aborted {
                at: Stage::ParameterConfiguration
            }
        );
    }

    #[test]
    fn non_fatal_stages_continue_on_failure() {
        let (kw, req) = (keywords("a"), request(Some(2)));
        let plan = PipelinePlan::for_query(&kw, &req);
        assert_eq!(
            plan.advance(Stage::KeywordRegistration, false),
            PipelineState::Running(Stage::ParameterConfiguration)
        );
        assert_eq!(
            plan.advance(Stage::QueryExecution, false),
            PipelineState::Running(Stage::HistoryRetrieval)
        );
        assert_eq!(
            plan.advance(Stage::HistoryRetrieval, false),
            PipelineState::Completed
        );
    }

    #[test]
    fn configure_only_plan() {
        let plan = PipelinePlan::configure_only();
        assert_eq!(
            plan.stages(),
            vec![Stage::HealthCheck, Stage::ParameterConfiguration]
        );
        assert_eq!(
            plan.advance(Stage::ParameterConfiguration, true),
            PipelineState::Completed
        );
    }

    #[test]
    fn escalation_retries_once_on_timeout() {
        let policy = TimeoutEscalation::new(Duration::from_secs(60), Duration::from_secs(240));
        let timeout = StageError::Timeout {
            after: Duration::from_secs(60),
        };

        let state = policy.start();
        assert_eq!(state.timeout(), Some(Duration::from_secs(60)));

        let state = policy.on_failure(state, &timeout);
        assert_eq!(state, AttemptState::Retrying(Duration::from_secs(240)));

        let state = policy.on_failure(state, &timeout);
        assert_eq!(state, AttemptState::Failed);
        assert_eq!(state.timeout(), None);
    }

    #[test]
    fn escalation_does_not_retry_other_failures() {
        let policy = TimeoutEscalation::new(Duration::from_secs(60), Duration::from_secs(240));
        let status = StageError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        };
        assert_eq!(
            policy.on_failure(policy.start(), &status),
            AttemptState::Failed
        );
    }

    #[test]
    fn escalation_succeeds_from_either_attempt() {
        let policy = TimeoutEscalation::new(Duration::from_secs(1), Duration::from_secs(2));
        assert_eq!(policy.on_success(policy.start()), AttemptState::Succeeded);
        assert_eq!(
            policy.on_success(AttemptState::Retrying(Duration::from_secs(2))),
            AttemptState::Succeeded
        );
    }
}
