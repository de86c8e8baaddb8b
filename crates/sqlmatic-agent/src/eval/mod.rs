//! Offline evaluation: replay labeled questions through an assistant and
//! score the SQL it produces against ground truth.
//!
//! The harness is decoupled from the agent through the `Assistant` trait, so
//! scripted fakes can exercise the scoring path without a model endpoint.

mod similarity;

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::EvaluationSettings;
use crate::observability::AgentEvent;

pub use similarity::{normalize, tfidf_cosine_similarity};

/// Statement verbs that mark a line as a SQL candidate.
const SQL_VERBS: [&str; 5] = ["select", "insert", "update", "delete", "with"];

/// Anything that can answer a question in a named thread.
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn answer(&self, thread_id: &str, question: &str) -> Result<String>;
}

/// One labeled evaluation case.
#[derive(Debug, Clone)]
pub struct EvaluationCase {
    pub question: String,
    pub ground_truth_sql: String,
}

/// Load labeled cases from a CSV file with the configured column names.
pub fn load_cases_from_csv(
    path: &Path,
    question_column: &str,
    ground_truth_column: &str,
) -> Result<Vec<EvaluationCase>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open ground truth file {}", path.display()))?;
    let headers = reader.headers().context("ground truth file has no header")?;
    let question_idx = headers
        .iter()
        .position(|h| h == question_column)
        .with_context(|| format!("ground truth file has no column named `{question_column}`"))?;
    let truth_idx = headers
        .iter()
        .position(|h| h == ground_truth_column)
        .with_context(|| {
            format!("ground truth file has no column named `{ground_truth_column}`")
        })?;

    let mut cases = Vec::new();
    for record in reader.records() {
        let record = record.context("failed to read ground truth record")?;
        cases.push(EvaluationCase {
            question: record.get(question_idx).unwrap_or_default().to_string(),
            ground_truth_sql: record.get(truth_idx).unwrap_or_default().to_string(),
        });
    }
    Ok(cases)
}

/// Extract the most plausible SQL statement from a model response.
///
/// Layered heuristic: first a response line starting with a statement verb,
/// then the contents of a ```sql fence, then any fenced block; an empty
/// string when nothing matches.
pub fn extract_sql_candidate(response: &str) -> String {
    let lowered = response.to_lowercase();
    for line in lowered.lines() {
        let trimmed = line.trim();
        if SQL_VERBS
            .iter()
            .any(|verb| trimmed.starts_with(verb))
        {
            return trimmed.to_string();
        }
    }
    if let Some(block) = fenced_block(&lowered, "```sql") {
        return block;
    }
    if let Some(block) = fenced_block(&lowered, "```") {
        return block;
    }
    String::new()
}

/// Contents of the first fence opened by `marker`, trimmed. This layer
/// requires a closing fence; verb-leading lines inside an unclosed fence are
/// still picked up by the earlier line scan.
fn fenced_block(text: &str, marker: &str) -> Option<String> {
    let (_, rest) = text.split_once(marker)?;
    let (block, _) = rest.split_once("```")?;
    let block = block.trim();
    if block.is_empty() {
        None
    } else {
        Some(block.to_string())
    }
}

/// Pass/fail verdict for one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Successful,
    Failed,
}

/// Score for one evaluated case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseOutcome {
    /// 1-based case position.
    pub case_id: usize,
    pub question: String,
    pub extracted_sql: String,
    pub ground_truth_sql: String,
    /// Absent when no SQL candidate was found or the assistant failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    pub status: CaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated evaluation run. Similarity statistics cover only the cases
/// that produced a SQL candidate.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub total_queries: usize,
    pub successful_queries: usize,
    pub failed_queries: usize,
    pub average_similarity: f64,
    pub median_similarity: f64,
    pub min_similarity: f64,
    pub max_similarity: f64,
    /// Percentage in [0, 100].
    pub success_rate: f64,
    pub execution_time_secs: f64,
    pub cases: Vec<CaseOutcome>,
}

impl EvaluationReport {
    /// Failed cases, for diagnostic listings.
    pub fn failed_cases(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.cases
            .iter()
            .filter(|outcome| outcome.status == CaseStatus::Failed)
    }
}

/// Replays cases through an assistant and aggregates similarity scores.
pub struct EvaluationHarness {
    threshold: f64,
}

impl EvaluationHarness {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn from_settings(settings: &EvaluationSettings) -> Self {
        Self::new(settings.similarity_threshold)
    }

    /// Run the first `limit` cases (all when `None`) and aggregate. Assistant
    /// failures become failed cases; the run itself never aborts mid-way.
    pub async fn run(
        &self,
        assistant: &dyn Assistant,
        cases: &[EvaluationCase],
        limit: Option<usize>,
    ) -> EvaluationReport {
        let selected = match limit {
            Some(limit) => &cases[..limit.min(cases.len())],
            None => cases,
        };
        info!(
            event = AgentEvent::EvaluationStarted.as_str(),
            cases = selected.len(),
            threshold = self.threshold,
            "evaluation started"
        );
        let started = Instant::now();

        let mut outcomes = Vec::with_capacity(selected.len());
        for (idx, case) in selected.iter().enumerate() {
            let case_id = idx + 1;
            let thread_id = format!("eval-{case_id}");
            let outcome = match assistant.answer(&thread_id, &case.question).await {
                Ok(response) => self.score(case_id, case, &response),
                Err(error) => CaseOutcome {
                    case_id,
                    question: case.question.clone(),
                    extracted_sql: String::new(),
                    ground_truth_sql: case.ground_truth_sql.clone(),
                    similarity: None,
                    status: CaseStatus::Failed,
                    error: Some(error.to_string()),
                },
            };
            debug!(
                event = AgentEvent::EvaluationCaseScored.as_str(),
                case_id,
                similarity = outcome.similarity,
                status = ?outcome.status,
                "evaluation case scored"
            );
            outcomes.push(outcome);
        }

        let report = self.aggregate(outcomes, started.elapsed().as_secs_f64());
        info!(
            event = AgentEvent::EvaluationCompleted.as_str(),
            total = report.total_queries,
            successful = report.successful_queries,
            failed = report.failed_queries,
            success_rate = report.success_rate,
            "evaluation completed"
        );
        report
    }

    fn score(&self, case_id: usize, case: &EvaluationCase, response: &str) -> CaseOutcome {
        let extracted = extract_sql_candidate(response);
        if extracted.is_empty() {
            return CaseOutcome {
                case_id,
                question: case.question.clone(),
                extracted_sql: extracted,
                ground_truth_sql: case.ground_truth_sql.clone(),
                similarity: None,
                status: CaseStatus::Failed,
                error: Some("no SQL candidate found in response".to_string()),
            };
        }
        let similarity = tfidf_cosine_similarity(
            &normalize(&extracted),
            &normalize(&case.ground_truth_sql),
        );
        let status = if similarity >= self.threshold {
            CaseStatus::Successful
        } else {
            CaseStatus::Failed
        };
        CaseOutcome {
            case_id,
            question: case.question.clone(),
            extracted_sql: extracted,
            ground_truth_sql: case.ground_truth_sql.clone(),
            similarity: Some(similarity),
            status,
            error: None,
        }
    }

    fn aggregate(&self, cases: Vec<CaseOutcome>, execution_time_secs: f64) -> EvaluationReport {
        let total = cases.len();
        let successful = cases
            .iter()
            .filter(|c| c.status == CaseStatus::Successful)
            .count();
        let mut scores: Vec<f64> = cases.iter().filter_map(|c| c.similarity).collect();
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let (average, median, min, max) = if scores.is_empty() {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let sum: f64 = scores.iter().sum();
            let mid = scores.len() / 2;
            let median = if scores.len() % 2 == 0 {
                (scores[mid - 1] + scores[mid]) / 2.0
            } else {
                scores[mid]
            };
            (
                sum / scores.len() as f64,
                median,
                scores[0],
                scores[scores.len() - 1],
            )
        };
        let success_rate = if total == 0 {
            0.0
        } else {
            successful as f64 / total as f64 * 100.0
        };
        EvaluationReport {
            total_queries: total,
            successful_queries: successful,
            failed_queries: total - successful,
            average_similarity: average,
            median_similarity: median,
            min_similarity: min,
            max_similarity: max,
            success_rate,
            execution_time_secs,
            cases,
        }
    }
}
