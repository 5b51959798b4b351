//! HTML rendering of step records
//!
//! One section per record, in recording order, with a severity class for
//! coloring. Detail values that are strings are shown verbatim; anything
//! else is pretty-printed JSON.

use crate::logger::StepRecord;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt::Write as _;

const STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; }
.step { margin-bottom: 20px; padding: 10px; border: 1px solid #ddd; }
.info { background-color: #dff0d8; }
.warning { background-color: #fcf8e3; }
.error { background-color: #f2dede; }
.details { margin-left: 20px; }
.timestamp { color: #666; font-size: 0.8em; }
pre { background-color: #f5f5f5; padding: 10px; white-space: pre-wrap; }";

/// Escape text for HTML element content and attribute values
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn detail_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn render_details(out: &mut String, details: &Value) {
    match details {
        Value::Object(fields) => {
            for (key, value) in fields {
                let _ = writeln!(
                    out,
                    "<p><strong>{}:</strong></p><pre>{}</pre>",
                    escape_html(key),
                    escape_html(&detail_text(value))
                );
            }
        }
        Value::Null => {}
        other => {
            let _ = writeln!(out, "<pre>{}</pre>", escape_html(&detail_text(other)));
        }
    }
}

/// Render a self-contained report document
#[must_use]
pub fn render_html(project: &str, generated_at: DateTime<Utc>, records: &[StepRecord]) -> String {
    let mut steps = String::new();
    for record in records {
        let _ = write!(
            steps,
            "<div class=\"step {}\">\n<h3>{}</h3>\n<p class=\"timestamp\">{}</p>\n<div class=\"details\">\n",
            record.severity.as_str(),
            escape_html(&record.step),
            record.timestamp.to_rfc3339(),
        );
        render_details(&mut steps, &record.details);
        steps.push_str("</div>\n</div>\n");
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Migration Report</title>\n\
         <style>\n{STYLE}\n</style>\n</head>\n<body>\n<h1>Migration Report</h1>\n\
         <p>Project: {}</p>\n<p>Generated at: {}</p>\n<h2>Migration Steps</h2>\n{steps}</body>\n</html>\n",
        escape_html(project),
        generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}
