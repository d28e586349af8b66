//! Table and text rendering for command output.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use serde_json::{Map, Value};
use settings_store::StoreError;
use settings_sync::SyncError;

use crate::commands::{DemoReport, SetOutcome};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

/// Stored settings as a two-column table, sorted by key.
pub fn entries_table(entries: &Map<String, Value>) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Key"), header_cell("Value")]);
    apply_table_style(&mut table);

    let mut keys: Vec<&String> = entries.keys().collect();
    keys.sort();
    for key in keys {
        let value = entries.get(key).map(compact_json).unwrap_or_default();
        table.add_row(vec![Cell::new(key), Cell::new(value)]);
    }
    table
}

/// Stored settings as pretty-printed JSON.
pub fn entries_json(entries: &Map<String, Value>) -> String {
    serde_json::to_string_pretty(entries).unwrap_or_else(|_| "{}".to_string())
}

pub fn demo_table(report: &DemoReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Window"),
        header_cell("Writes"),
        header_cell("Value"),
        header_cell("Phase"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);

    for window in &report.windows {
        let value = if window.value == report.expected {
            Cell::new(window.value).fg(Color::Green)
        } else {
            Cell::new(window.value).fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(&window.window),
            Cell::new(window.writes),
            value,
            dim_cell(format!("{:?}", window.phase)),
        ]);
    }
    table
}

/// One-line verdict printed under the demo table.
pub fn demo_verdict(report: &DemoReport) -> String {
    let status = if report.converged() {
        "converged"
    } else {
        "DIVERGED"
    };
    format!(
        "{} windows {} on {} ({} store writes, {} store reads)",
        report.windows.len(),
        status,
        report.expected,
        report.store_sets,
        report.store_gets
    )
}

pub fn set_message(outcome: &SetOutcome) -> String {
    let value = compact_json(&outcome.value);
    match (&outcome.previous, outcome.changed) {
        (_, false) => format!("{} unchanged ({})", outcome.key, value),
        (Some(previous), true) => {
            format!("{}: {} -> {}", outcome.key, compact_json(previous), value)
        }
        (None, true) => format!("{}: {}", outcome.key, value),
    }
}

/// Render a command failure, followed by the friendly message and hint when
/// the cause is a settings error.
pub fn error_report(error: &anyhow::Error) -> String {
    let mut report = format!("error: {error:#}");
    let friendly = if let Some(e) = error.downcast_ref::<SyncError>() {
        Some((e.user_message(), e.suggestion()))
    } else {
        error
            .downcast_ref::<StoreError>()
            .map(|e| (e.user_message(), e.suggestion()))
    };
    if let Some((message, suggestion)) = friendly {
        report.push_str("\n  ");
        report.push_str(&message);
        if let Some(suggestion) = suggestion {
            report.push_str("\n  hint: ");
            report.push_str(&suggestion);
        }
    }
    report
}

pub fn print_entries(entries: &Map<String, Value>) {
    if entries.is_empty() {
        println!("No settings stored.");
    } else {
        println!("{}", entries_table(entries));
    }
}

pub fn print_demo(report: &DemoReport) {
    println!("{}", demo_table(report));
    println!("{}", demo_verdict(report));
}

fn compact_json(value: &Value) -> String {
    value.to_string()
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outcome(previous: Option<Value>, changed: bool) -> SetOutcome {
        SetOutcome {
            key: "theme".to_string(),
            previous,
            value: json!("light"),
            changed,
        }
    }

    #[test]
    fn test_set_messages() {
        assert_eq!(set_message(&outcome(None, true)), "theme: \"light\"");
        assert_eq!(
            set_message(&outcome(Some(json!("dark")), true)),
            "theme: \"dark\" -> \"light\""
        );
        assert_eq!(
            set_message(&outcome(Some(json!("light")), false)),
            "theme unchanged (\"light\")"
        );
    }

    #[test]
    fn test_entries_table_lists_keys() {
        let mut entries = Map::new();
        entries.insert("theme".to_string(), json!("light"));
        entries.insert("apps".to_string(), json!(["calc"]));

        let mut table = entries_table(&entries);
        table.force_no_tty();
        let rendered = table.to_string();

        let apps = rendered.find("apps").unwrap();
        let theme = rendered.find("theme").unwrap();
        assert!(apps < theme);
        assert!(rendered.contains("[\"calc\"]"));
    }

    #[test]
    fn test_error_report_adds_hint_for_bad_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.toml");
        std::fs::write(&path, "debounce_ms = \"fast\"\n").unwrap();

        let error = crate::commands::load_config(Some(&path)).unwrap_err();
        let report = error_report(&error);
        assert!(report.starts_with("error: load sync config from"));
        assert!(report.contains("\n  The sync configuration is not valid."));
        assert!(report.contains("\n  hint: Fix or delete the configuration file"));
    }

    #[test]
    fn test_error_report_without_settings_cause() {
        let error = anyhow::anyhow!("demo needs at least one window");
        assert_eq!(error_report(&error), "error: demo needs at least one window");
    }
}
