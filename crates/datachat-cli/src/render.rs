//! Plain-text rendering of chats, databases and transcripts.

use datachat_core::cell_text;
use datachat_types::{
    ChartSeries, ChartSpec, ChatSummary, DatabaseRef, Interpretation, Message, StructuredAnswer,
    Table,
};
use std::fmt::Write;

pub fn render_chat_list(chats: &[ChatSummary], active_id: Option<&str>) -> String {
    if chats.is_empty() {
        return "No chats.\n".to_string();
    }
    let mut out = String::new();
    for chat in chats {
        let marker = if Some(chat.chat_id.as_str()) == active_id { '*' } else { ' ' };
        let db = chat.database_id.as_deref().unwrap_or("-");
        let _ = writeln!(out, "{} {}  {}  [{}]", marker, chat.chat_id, chat.display_title(), db);
    }
    out
}

pub fn render_databases(databases: &[DatabaseRef], selected_id: Option<&str>) -> String {
    if databases.is_empty() {
        return "No active databases.\n".to_string();
    }
    let mut out = String::new();
    for db in databases {
        let marker = if Some(db.database_id.as_str()) == selected_id { '*' } else { ' ' };
        let _ = writeln!(out, "{} {}  {}", marker, db.database_id, db.database_name);
    }
    out
}

/// Render every message, classifying each response with `interpret`.
pub fn render_transcript(messages: &[Message], interpret: impl Fn(&str) -> Interpretation) -> String {
    if messages.is_empty() {
        return "No messages yet.\n".to_string();
    }
    messages
        .iter()
        .map(|m| render_message(m, &interpret(&m.response)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_message(message: &Message, interpretation: &Interpretation) -> String {
    let mut out = format!("> {}\n", message.prompt);
    match interpretation {
        Interpretation::PlainText(text) => {
            out.push_str(text);
            out.push('\n');
        }
        Interpretation::Structured(answer) => out.push_str(&render_answer(answer)),
    }
    out
}

fn render_answer(answer: &StructuredAnswer) -> String {
    let mut out = String::new();
    if !answer.query.is_empty() {
        let _ = writeln!(out, "SQL: {}", answer.query);
    }
    if !answer.explanation.is_empty() {
        let _ = writeln!(out, "{}", answer.explanation);
    }
    if answer.table.is_empty() {
        out.push_str("No results.\n");
    } else {
        out.push_str(&render_table(&answer.table));
    }
    if let Some(chart) = &answer.chart {
        out.push_str(&render_chart(chart));
    }
    out
}

/// Column-aligned table with a dashed rule under the header.
pub fn render_table(table: &Table) -> String {
    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    push_row(&mut out, table.columns.iter().map(String::as_str), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, rule.iter().map(String::as_str), &widths);
    for row in &cells {
        push_row(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line = cells
        .zip(widths)
        .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

fn render_chart(chart: &ChartSpec) -> String {
    let points = match &chart.series {
        ChartSeries::Pie { labels, .. } => labels.len(),
        ChartSeries::Cartesian { x, .. } => x.len(),
    };
    let kind = if chart.kind.is_empty() { "chart" } else { chart.kind.as_str() };
    let mut out = format!(
        "Chart: {} of {} by {} ({} points)\n",
        kind, chart.y_axis, chart.x_axis, points
    );
    if let Some(title) = &chart.title {
        let _ = writeln!(out, "  title: {}", title);
    }
    let _ = writeln!(out, "  why: {}", chart.why);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use datachat_core::interpret;
    use serde_json::json;

    #[test]
    fn test_plain_and_placeholder_messages() {
        let messages = vec![Message::new("hi", "hello"), Message::placeholder("next")];
        let text = render_transcript(&messages, interpret);
        assert_eq!(text, "> hi\nhello\n\n> next\nThinking...\n");
    }

    #[test]
    fn test_empty_transcript() {
        assert_eq!(render_transcript(&[], interpret), "No messages yet.\n");
    }

    #[test]
    fn test_table_alignment() {
        let table = Table {
            columns: vec!["name".into(), "n".into()],
            rows: vec![vec![json!("Alexandra"), json!(3)], vec![json!("Bo"), json!(null)]],
        };
        assert_eq!(
            render_table(&table),
            "name       n\n---------  -\nAlexandra  3\nBo\n"
        );
    }

    #[test]
    fn test_structured_without_rows() {
        let response = r#"{"query":"SELECT 1 WHERE 0","explanation":"nothing","results":[]}"#;
        let text = render_message(&Message::new("q", response), &interpret(response));
        assert_eq!(text, "> q\nSQL: SELECT 1 WHERE 0\nnothing\nNo results.\n");
    }

    #[test]
    fn test_structured_with_chart() {
        let response = json!({
            "query": "SELECT day, sales FROM t",
            "explanation": "daily",
            "results": [{"day": "Mon", "sales": 10}, {"day": "Tue", "sales": 20}],
            "visualization": {"type": "bar", "x_axis": "day", "y_axis": "sales", "why": "trend"}
        })
        .to_string();
        let text = render_message(&Message::new("q", response.clone()), &interpret(&response));
        assert!(text.contains("day  sales\n---  -----\nMon  10\nTue  20\n"));
        assert!(text.contains("Chart: bar of sales by day (2 points)\n  why: trend\n"));
    }

    #[test]
    fn test_chat_list_marks_active() {
        let chats = vec![
            ChatSummary::new("abcdef123", "", Some("d1".into())),
            ChatSummary::new("c2", "Revenue", None),
        ];
        let text = render_chat_list(&chats, Some("c2"));
        assert_eq!(text, "  abcdef123  Chat abcdef  [d1]\n* c2  Revenue  [-]\n");
        assert_eq!(render_chat_list(&[], None), "No chats.\n");
    }

    #[test]
    fn test_untyped_chart_summary() {
        let response = json!({
            "query": "q",
            "explanation": "",
            "results": [{"day": "Mon", "sales": 10}],
            "visualization": {"x_axis": "day", "y_axis": "sales", "why": "trend"}
        })
        .to_string();
        let text = render_message(&Message::new("q", response.clone()), &interpret(&response));
        assert!(text.contains("Chart: chart of sales by day (1 points)\n"));
    }
}
