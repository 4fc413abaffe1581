//! CLI output: a JSON branch and a `comfy-table` branch, selected by the
//! global `--json` flag.

use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};
use serde::Serialize;

/// Print `value` as pretty JSON when `json` is set, otherwise build a table
/// from `headers`/`rows`.
pub fn emit<T: Serialize>(json: bool, value: &T, headers: &[&str], rows: Vec<Vec<String>>) {
    if json {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("failed to serialize output: {e}"),
        }
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h).add_attribute(Attribute::Bold)));
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

/// Print a single-value JSON or plain-text success message.
pub fn emit_message(json: bool, message: &str) {
    if json {
        println!("{}", serde_json::json!({ "message": message }));
    } else {
        println!("{message}");
    }
}
