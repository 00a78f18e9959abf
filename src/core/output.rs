//! Output rendering helpers for CLI surfaces.
//!
//! CSV here is the flat feed-export dialect the original extractor spoke:
//! one row per indicator, optional header row, configurable separator, no
//! quoting. Values containing the separator are passed through untouched.

/// Render `(type, value)` rows as separator-joined lines.
pub fn render_csv(rows: &[(String, String)], headers: bool, separator: &str) -> String {
    let mut out = Vec::with_capacity(rows.len() + 1);
    if headers {
        out.push(format!("type{}value", separator));
    }
    for (kind, value) in rows {
        out.push(format!("{}{}{}", kind, separator, value));
    }
    out.join("\n")
}

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<(String, String)> {
        vec![
            ("domain".to_string(), "evil.example".to_string()),
            ("md5".to_string(), "9e107d9d372bb6826bd81d3542a419d6".to_string()),
        ]
    }

    #[test]
    fn test_render_csv_without_headers() {
        let out = render_csv(&rows(), false, ",");
        assert_eq!(
            out,
            "domain,evil.example\nmd5,9e107d9d372bb6826bd81d3542a419d6"
        );
    }

    #[test]
    fn test_render_csv_with_headers_and_separator() {
        let out = render_csv(&rows(), true, ";");
        assert!(out.starts_with("type;value\n"));
        assert!(out.contains("domain;evil.example"));
    }

    #[test]
    fn test_render_csv_empty() {
        assert_eq!(render_csv(&[], false, ","), "");
        assert_eq!(render_csv(&[], true, ","), "type,value");
    }

    #[test]
    fn test_compact_line_bounds_length() {
        let long = "a ".repeat(100);
        let compact = compact_line(&long, 10);
        assert!(compact.ends_with("..."));
        assert!(compact.chars().count() <= 13);
    }
}
