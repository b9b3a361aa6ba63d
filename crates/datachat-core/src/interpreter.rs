//! Classification of stored responses into plain text or structured answers.
//!
//! The query service does not tag its payloads, so a response is treated as
//! structured when it parses as a JSON object and as plain text otherwise.
//! Callers go through [`ResponseInterpreter`] so the heuristic can be replaced
//! once the server signals the kind explicitly.

use datachat_types::{
    ChartSeries, ChartSpec, Interpretation, Row, StructuredAnswer, Table, Visualization,
};
use serde_json::{Map, Value};

/// Turns a raw response string into something renderable.
pub trait ResponseInterpreter: Send + Sync {
    fn interpret(&self, response: &str) -> Interpretation;
}

/// Try-parse-else-text interpreter.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSniffInterpreter;

impl ResponseInterpreter for JsonSniffInterpreter {
    fn interpret(&self, response: &str) -> Interpretation {
        let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(response) else {
            return Interpretation::PlainText(response.to_string());
        };
        Interpretation::Structured(structured_answer(&obj))
    }
}

/// Interpret with the default [`JsonSniffInterpreter`].
pub fn interpret(response: &str) -> Interpretation {
    JsonSniffInterpreter.interpret(response)
}

/// Display text for a table cell.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn structured_answer(obj: &Map<String, Value>) -> StructuredAnswer {
    let results: Vec<Row> = match obj.get("results") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Object(row) => row.clone(),
                _ => Row::new(),
            })
            .collect(),
        _ => Vec::new(),
    };

    let visualization = match obj.get("visualization") {
        Some(Value::Object(v)) => Some(visualization(v)),
        _ => None,
    };

    let table = table(&results);
    let chart = visualization.as_ref().and_then(|v| chart(v, &results));

    StructuredAnswer {
        query: text_field(obj, "query"),
        explanation: text_field(obj, "explanation"),
        results,
        visualization,
        table,
        chart,
    }
}

fn text_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key).map(cell_text).unwrap_or_default()
}

fn opt_text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn visualization(obj: &Map<String, Value>) -> Visualization {
    Visualization {
        kind: opt_text(obj, "type"),
        x_axis: opt_text(obj, "x_axis"),
        y_axis: opt_text(obj, "y_axis"),
        color: opt_text(obj, "color"),
        title: opt_text(obj, "title"),
        why: opt_text(obj, "why"),
        figure_json: opt_text(obj, "figure_json"),
    }
}

/// Column headers come from the first row. Every row contributes its own
/// values in insertion order, positionally under those headers; rows are not
/// re-keyed, so a row whose keys differ from the first row renders misaligned.
/// Known limitation, kept so tables match what the service's web client shows.
fn table(results: &[Row]) -> Table {
    let Some(first) = results.first() else {
        return Table::default();
    };
    Table {
        columns: first.keys().cloned().collect(),
        rows: results
            .iter()
            .map(|row| row.values().cloned().collect())
            .collect(),
    }
}

fn column(results: &[Row], key: &str) -> Vec<Value> {
    results
        .iter()
        .map(|row| row.get(key).cloned().unwrap_or(Value::Null))
        .collect()
}

fn chart(v: &Visualization, results: &[Row]) -> Option<ChartSpec> {
    let why = v.why.as_ref()?;
    // A missing type is not "none"; it charts like any non-pie type
    let kind = v.kind.clone().unwrap_or_default();
    if kind == "none" || results.is_empty() {
        return None;
    }
    let x_axis = v.x_axis.as_ref()?;
    let y_axis = v.y_axis.as_ref()?;

    let series = if kind == "pie" {
        ChartSeries::Pie {
            labels: column(results, x_axis),
            values: column(results, y_axis),
        }
    } else {
        ChartSeries::Cartesian {
            x: column(results, x_axis),
            y: column(results, y_axis),
            mode: (kind == "scatter").then(|| "markers".to_string()),
            color: v.color.as_deref().map(|c| column(results, c)),
        }
    };

    Some(ChartSpec {
        kind,
        x_axis: x_axis.clone(),
        y_axis: y_axis.clone(),
        title: v.title.clone(),
        why: why.clone(),
        series,
        figure_json: v.figure_json.clone(),
    })
}
