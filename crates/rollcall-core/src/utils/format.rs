use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Lowercase and collapse internal whitespace, for case-insensitive keys
pub fn normalize_key(s: &str) -> String {
    s.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a ratio as a whole-number percentage, blank when undefined
pub fn format_percentage(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{}%", (r * 100.0).round() as i64),
        None => String::new(),
    }
}

/// Parse a spreadsheet-style boolean cell
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1" | "x"
    )
}

/// Parse a timestamp cell: RFC 3339, or a naive `YYYY-MM-DD HH:MM[:SS]` taken as UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Format an optional timestamp for a table cell
pub fn format_timestamp(value: &Option<DateTime<Utc>>) -> String {
    value.map(|dt| dt.to_rfc3339()).unwrap_or_default()
}

/// Generate a record id: `<prefix>-<yyyymmddHHMMSS>-<8 hex>`
pub fn generate_id(prefix: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}-{}-{:08x}",
        prefix,
        at.format("%Y%m%d%H%M%S"),
        rand::random::<u32>()
    )
}

/// Generate a record id that `is_taken` does not reject.
pub fn generate_unique_id(prefix: &str, at: DateTime<Utc>, is_taken: impl Fn(&str) -> bool) -> String {
    loop {
        let id = generate_id(prefix, at);
        if !is_taken(&id) {
            return id;
        }
    }
}
