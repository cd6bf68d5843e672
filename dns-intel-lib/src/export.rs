//! JSON export of lookup results.

use chrono::NaiveDate;

/// Pretty-print a result for export, with two-space indentation.
pub fn export_json(value: &serde_json::Value) -> String {
    // Serializing a Value cannot fail: its map keys are always strings.
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// File name for an exported result, e.g. `dns-analysis-example-com-2026-03-01.json`.
pub fn export_file_name(domain: &str, date: NaiveDate) -> String {
    let domain = if domain.is_empty() { "unknown" } else { domain };
    format!(
        "dns-analysis-{}-{}.json",
        sanitize_file_component(domain),
        date.format("%Y-%m-%d")
    )
}

/// Replace everything except ASCII letters and digits with `-`.
pub fn sanitize_file_component(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}
