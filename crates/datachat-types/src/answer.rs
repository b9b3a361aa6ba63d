//! Renderer-agnostic descriptors for interpreted query responses.
//!
//! The core never draws anything. It hands these descriptors to whatever
//! renders the transcript (terminal, web view, chart library).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One result row: column name to scalar value, in server order.
pub type Row = Map<String, Value>;

/// Chart hint attached to a structured answer by the query service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    /// Chart kind ("bar", "line", "scatter", "pie", "none", ...).
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub x_axis: Option<String>,
    #[serde(default)]
    pub y_axis: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Why this chart was chosen. No chart is drawn without it.
    #[serde(default)]
    pub why: Option<String>,
    /// Server-rendered figure, passed through untouched.
    #[serde(default)]
    pub figure_json: Option<String>,
}

/// Tabular view of a result set.
///
/// Columns come from the first row only; later rows are read in that order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Data series of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartSeries {
    /// Pie charts carry labels/values and no axes.
    Pie { labels: Vec<Value>, values: Vec<Value> },
    /// Every other chart kind.
    Cartesian {
        x: Vec<Value>,
        y: Vec<Value>,
        /// "markers" for scatter plots.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode: Option<String>,
        /// Per-point color channel.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<Vec<Value>>,
    },
}

/// Normalized chart description handed to an external renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub x_axis: String,
    pub y_axis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub why: String,
    #[serde(flatten)]
    pub series: ChartSeries,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub figure_json: Option<String>,
}

/// A response carrying a generated query and its results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredAnswer {
    pub query: String,
    pub explanation: String,
    pub results: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization: Option<Visualization>,
    pub table: Table,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
}

/// How a stored response should be rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    /// Render verbatim.
    PlainText(String),
    Structured(StructuredAnswer),
}

impl Interpretation {
    pub fn as_structured(&self) -> Option<&StructuredAnswer> {
        match self {
            Interpretation::Structured(answer) => Some(answer),
            Interpretation::PlainText(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pie_chart_serializes_without_axes_arrays() {
        let chart = ChartSpec {
            kind: "pie".into(),
            x_axis: "region".into(),
            y_axis: "total".into(),
            title: None,
            why: "share".into(),
            series: ChartSeries::Pie {
                labels: vec![json!("EU")],
                values: vec![json!(3)],
            },
            figure_json: None,
        };
        let value = serde_json::to_value(&chart).unwrap();
        assert_eq!(value["labels"], json!(["EU"]));
        assert!(value.get("x").is_none());
        assert!(value.get("y").is_none());
        assert_eq!(value["type"], "pie");
    }

    #[test]
    fn test_cartesian_chart_skips_empty_channels() {
        let chart = ChartSpec {
            kind: "bar".into(),
            x_axis: "day".into(),
            y_axis: "sales".into(),
            title: Some("Sales".into()),
            why: "trend".into(),
            series: ChartSeries::Cartesian {
                x: vec![json!("Mon")],
                y: vec![json!(10)],
                mode: None,
                color: None,
            },
            figure_json: None,
        };
        let value = serde_json::to_value(&chart).unwrap();
        assert_eq!(value["x"], json!(["Mon"]));
        assert!(value.get("mode").is_none());
        assert!(value.get("color").is_none());
        assert!(value.get("labels").is_none());
    }
}
