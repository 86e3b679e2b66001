//! Diff generation for audit logging
//!
//! Generates human-readable diffs between the before and after state of a
//! record for update entries.

use crate::models::{FieldValue, Record};

/// Generate a human-readable diff between two records
///
/// Nested records are descended into with dotted field paths. Returns `None`
/// when nothing changed.
pub fn generate_diff(before: &Record, after: &Record) -> Option<String> {
    let changes = collect_changes(before, after, "");
    if changes.is_empty() {
        None
    } else {
        Some(changes.join(", "))
    }
}

fn collect_changes(before: &Record, after: &Record, prefix: &str) -> Vec<String> {
    let path = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        }
    };

    let mut changes = Vec::new();

    for (key, before_val) in before.iter() {
        match after.get(key) {
            Some(after_val) if after_val == before_val => {}
            Some(FieldValue::Record(after_rec)) => match before_val {
                FieldValue::Record(before_rec) => {
                    changes.extend(collect_changes(before_rec, after_rec, &path(key)))
                }
                _ => changes.push(format!(
                    "{}: {} -> {}",
                    path(key),
                    format_value(before_val),
                    format_value(&FieldValue::Record(after_rec.clone()))
                )),
            },
            Some(after_val) => changes.push(format!(
                "{}: {} -> {}",
                path(key),
                format_value(before_val),
                format_value(after_val)
            )),
            None => changes.push(format!("{}: {} -> (removed)", path(key), format_value(before_val))),
        }
    }

    for (key, after_val) in after.iter() {
        if !before.contains_key(key) {
            changes.push(format!("{}: (added) -> {}", path(key), format_value(after_val)));
        }
    }

    changes
}

/// Format a value for human-readable display
fn format_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => {
            if s.chars().count() > 50 {
                let head: String = s.chars().take(47).collect();
                format!("\"{}...\"", head)
            } else {
                format!("\"{}\"", s)
            }
        }
        FieldValue::List(items) => format!("[{} items]", items.len()),
        FieldValue::Record(record) => format!("{{{} fields}}", record.len()),
        other => other.to_string(),
    }
}
