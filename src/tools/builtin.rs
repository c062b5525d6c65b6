//! Built-in analysis tools.
//!
//! These return canned summaries of the platform's regional data files so the
//! default wiring is runnable end to end; real search and temporal indexes
//! plug in behind the same schemas.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::tools::tool::{require_str, Tool};

fn sample_files() -> Vec<Value> {
    vec![
        json!({
            "id": "region_a_scores_2023",
            "name": "Region A – test scores 2023",
            "summary": "Student ID, subject, test score, test date, intervention type.",
        }),
        json!({
            "id": "region_b_scores_2023",
            "name": "Region B – test scores 2023",
            "summary": "Student ID, exam result, test date, activity type.",
        }),
        json!({
            "id": "interventions_2022_2024",
            "name": "Regions A+B – interventions 2022–2024",
            "summary": "Region, intervention type, start/end dates, teacher training, mentoring.",
        }),
    ]
}

/// Lists available data files and their summaries.
pub struct LoadFilesTool;

#[async_trait]
impl Tool for LoadFilesTool {
    fn name(&self) -> &str {
        "load_files"
    }

    fn description(&self) -> &str {
        "Return a list of available data files and their summaries. \
         Use this to understand what data exists across regions."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 50,
                    "description": "Maximum number of files to return.",
                }
            },
            "required": [],
        })
    }

    async fn execute(&self, params: Value) -> Result<Value, ToolError> {
        let mut files = sample_files();
        if let Some(limit) = params.get("limit").and_then(Value::as_u64) {
            files.truncate(limit as usize);
        }
        Ok(json!({ "files": files }))
    }
}

/// Ranks files against a natural-language query.
pub struct FindRelevantFilesTool;

#[async_trait]
impl Tool for FindRelevantFilesTool {
    fn name(&self) -> &str {
        "find_relevant_files"
    }

    fn description(&self) -> &str {
        "Given a natural language query, return the most relevant files \
         based on semantic similarity of their summaries."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The user's question or a refined search query.",
                },
                "top_k": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 20,
                    "default": 5,
                    "description": "How many files to return at most.",
                },
            },
            "required": ["query"],
        })
    }

    async fn execute(&self, params: Value) -> Result<Value, ToolError> {
        let query = require_str(&params, "query")?;
        let top_k = params.get("top_k").and_then(Value::as_u64).unwrap_or(5) as usize;

        let mut files = sample_files();
        files.truncate(top_k);
        Ok(json!({
            "query": query,
            "files": files,
            "note": "Canned result; replace with semantic search over file summaries.",
        }))
    }
}

/// Filters data by a date interval.
pub struct TemporalSearchTool;

#[async_trait]
impl Tool for TemporalSearchTool {
    fn name(&self) -> &str {
        "temporal_search"
    }

    fn description(&self) -> &str {
        "Filter data by a date interval, e.g., a specific school year or \
         the first six months after a region joins the network."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "start_date": {
                    "type": "string",
                    "description": "Start date (inclusive) in ISO format YYYY-MM-DD.",
                },
                "end_date": {
                    "type": "string",
                    "description": "End date (inclusive) in ISO format YYYY-MM-DD.",
                },
            },
            "required": ["start_date", "end_date"],
        })
    }

    async fn execute(&self, params: Value) -> Result<Value, ToolError> {
        let start_date = require_str(&params, "start_date")?;
        let end_date = require_str(&params, "end_date")?;

        Ok(json!({
            "start_date": start_date,
            "end_date": end_date,
            "files": [
                {
                    "id": "region_a_scores_6m_after_join",
                    "name": "Region A – 6 months after joining",
                    "summary": "Scores and interventions in the 6-month window after region onboarding.",
                }
            ],
            "note": "Canned temporal filter; connect to date-indexed records later.",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_files_respects_limit() {
        let out = LoadFilesTool
            .execute(json!({"limit": 1}))
            .await
            .unwrap();
        assert_eq!(out["files"].as_array().unwrap().len(), 1);

        let out = LoadFilesTool.execute(json!({})).await.unwrap();
        assert_eq!(out["files"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn find_relevant_files_requires_query() {
        let err = FindRelevantFilesTool.execute(json!({})).await.unwrap_err();
        assert!(err.to_string().contains("query"));

        let out = FindRelevantFilesTool
            .execute(json!({"query": "scores", "top_k": 2}))
            .await
            .unwrap();
        assert_eq!(out["query"], "scores");
        assert_eq!(out["files"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn temporal_search_echoes_interval() {
        let out = TemporalSearchTool
            .execute(json!({"start_date": "2023-09-01", "end_date": "2024-02-29"}))
            .await
            .unwrap();
        assert_eq!(out["start_date"], "2023-09-01");
        assert_eq!(out["end_date"], "2024-02-29");
        assert!(out["files"].is_array());
    }
}
