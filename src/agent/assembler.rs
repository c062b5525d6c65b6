//! Response assembler: parses the model's final text into a structured
//! answer plus an optional chart description.
//!
//! Two contracts exist (one per deployment, selected by configuration):
//!
//! - `JsonEnvelope`: the final message is a single JSON object
//!   `{"answer": ..., "plot": {...}|null}`.
//! - `ChartBlock`: free-form prose embedding at most one chart block between
//!   [`GRAPH_SPEC_OPEN`] and [`GRAPH_SPEC_CLOSE`] marker lines.
//!
//! Malformed output never fails assembly; the raw text becomes the answer
//! and the chart is absent. The upstream model is not guaranteed to honor
//! its output instructions.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marker opening a chart block in the `ChartBlock` contract.
pub const GRAPH_SPEC_OPEN: &str = "<<<graph_spec>>>";
/// Marker closing a chart block.
pub const GRAPH_SPEC_CLOSE: &str = "<<<end_graph_spec>>>";

/// Which final-answer contract the deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerContract {
    #[default]
    JsonEnvelope,
    ChartBlock,
}

impl FromStr for AnswerContract {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json_envelope" | "json" => Ok(Self::JsonEnvelope),
            "chart_block" | "chart" => Ok(Self::ChartBlock),
            other => Err(format!(
                "unknown answer contract '{other}' (expected 'json_envelope' or 'chart_block')"
            )),
        }
    }
}

/// Loose chart descriptor from the JSON-envelope contract. All fields
/// optional; unrecognized fields in the model output are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One named series of a line chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// Typed chart from the chart-block contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GraphSpec {
    Histogram {
        title: String,
        x_values: Vec<String>,
        y_values: Vec<f64>,
        y_axis_label: String,
    },
    Pie {
        title: String,
        labels: Vec<String>,
        values: Vec<f64>,
    },
    Line {
        title: String,
        x_values: Vec<String>,
        y_series: Vec<LineSeries>,
        y_axis_label: String,
    },
}

impl GraphSpec {
    /// Array-length consistency: every value series must match its category
    /// axis.
    pub fn is_consistent(&self) -> bool {
        match self {
            Self::Histogram {
                x_values, y_values, ..
            } => x_values.len() == y_values.len(),
            Self::Pie { labels, values, .. } => labels.len() == values.len(),
            Self::Line {
                x_values, y_series, ..
            } => y_series.iter().all(|s| s.values.len() == x_values.len()),
        }
    }
}

/// Assembly result: the answer text plus whichever chart shape the active
/// contract produced.
#[derive(Debug, Clone, Default)]
pub struct AssembledAnswer {
    pub answer: String,
    pub plot: Option<PlotSpec>,
    pub graph: Option<GraphSpec>,
}

/// Parse the model's final text under the given contract. Never fails.
pub fn assemble(final_text: &str, contract: AnswerContract) -> AssembledAnswer {
    match contract {
        AnswerContract::JsonEnvelope => assemble_json_envelope(final_text),
        AnswerContract::ChartBlock => assemble_chart_block(final_text),
    }
}

fn assemble_json_envelope(final_text: &str) -> AssembledAnswer {
    let Ok(parsed) = serde_json::from_str::<Value>(final_text) else {
        // Not valid JSON; treat it as a plain answer.
        return AssembledAnswer {
            answer: final_text.to_string(),
            ..Default::default()
        };
    };

    let answer = parsed
        .get("answer")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| final_text.to_string());

    let plot = parsed
        .get("plot")
        .filter(|v| v.is_object())
        .and_then(|v| serde_json::from_value::<PlotSpec>(v.clone()).ok());

    AssembledAnswer {
        answer,
        plot,
        graph: None,
    }
}

fn assemble_chart_block(final_text: &str) -> AssembledAnswer {
    let mut prose = String::new();
    let mut blocks: Vec<&str> = Vec::new();
    let mut rest = final_text;

    // Collect complete OPEN..CLOSE regions; stray markers stay in the prose.
    while let Some(open) = rest.find(GRAPH_SPEC_OPEN) {
        let after_open = open + GRAPH_SPEC_OPEN.len();
        let Some(close) = rest[after_open..].find(GRAPH_SPEC_CLOSE) else {
            break;
        };
        prose.push_str(&rest[..open]);
        blocks.push(&rest[after_open..after_open + close]);
        rest = &rest[after_open + close + GRAPH_SPEC_CLOSE.len()..];
    }
    prose.push_str(rest);

    if blocks.is_empty() {
        return AssembledAnswer {
            answer: final_text.to_string(),
            ..Default::default()
        };
    }

    // A duplicate block is treated as absent, same as an invalid one.
    let graph = if blocks.len() == 1 {
        serde_json::from_str::<GraphSpec>(blocks[0].trim())
            .ok()
            .filter(GraphSpec::is_consistent)
    } else {
        tracing::debug!("Final answer contained {} chart blocks, ignoring all", blocks.len());
        None
    };

    AssembledAnswer {
        answer: prose.trim().to_string(),
        plot: None,
        graph,
    }
}
