//! One-line console rendering of content items
//!
//! Values are printed the way the feed's reference console client prints
//! them: strings bare at the top level, everything nested in Python literal
//! form (`['AAPL', 'MSFT']`, `{'name': 'TSLA'}`, `True`, `None`).
//!
//! Items carry more fields (`content`, `updated`, ...) than are shown here.

use serde_json::Value;

/// `Title: <title> ; Tickers: [..] ; Channels: [..]`
pub fn format_item(item: &Value) -> String {
    format!(
        "Title: {} ; Tickers: {} ; Channels: {}",
        field(item, "title", "No title."),
        field(item, "tickers", "[]"),
        field(item, "channels", "[]")
    )
}

/// A missing key falls back to `default`; a present `null` prints as `None`
fn field(item: &Value, key: &str, default: &str) -> String {
    match item.get(key) {
        None => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => repr(other),
    }
}

fn repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(entries) => {
            let entries: Vec<String> = entries.iter().map(repr).collect();
            format!("[{}]", entries.join(", "))
        }
        Value::Object(fields) => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), repr(v)))
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
    }
}

/// Single-quoted unless the text holds a `'` and no `"`
fn quote(s: &str) -> String {
    let delim = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c == '\x7f' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}
