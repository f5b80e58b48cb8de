//! Naming and literal helpers shared by code generation and diffing.

use convert_case::{Case, Casing};
use sha2::{Digest, Sha256};

/// Convert a string to snake_case
pub fn to_snake_case(s: &str) -> String {
    s.to_case(Case::Snake)
}

/// Convert a string to PascalCase
pub fn to_pascal_case(s: &str) -> String {
    s.to_case(Case::Pascal)
}

/// Convert a string to camelCase
pub fn to_camel_case(s: &str) -> String {
    s.to_case(Case::Camel)
}

/// Convert a string to SCREAMING_SNAKE_CASE
pub fn to_screaming_snake_case(s: &str) -> String {
    s.to_case(Case::ScreamingSnake)
}

/// Convert a string to Title Case (`work_order` -> `Work Order`)
pub fn to_title_case(s: &str) -> String {
    s.to_case(Case::Title)
}

/// Lower-cased word tokens, split on `_`, `-`, spaces and case boundaries
pub fn tokens(s: &str) -> Vec<String> {
    s.to_case(Case::Snake)
        .split('_')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// English plural of a snake_case name (`category` -> `categories`).
///
/// Only the last word is inflected.
pub fn pluralize(name: &str) -> String {
    let lower = name.to_lowercase();
    if lower.ends_with("ss")
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
        || lower.ends_with("us")
    {
        return format!("{}es", name);
    }
    if lower.ends_with('s') {
        return name.to_string();
    }
    if let Some(stem) = name.strip_suffix('y') {
        let before = stem.chars().last().map(|c| c.to_ascii_lowercase());
        if !matches!(before, Some('a' | 'e' | 'i' | 'o' | 'u') | None) {
            return format!("{}ies", stem);
        }
    }
    format!("{}s", name)
}

/// Escape a string for use in Python string literals
pub fn escape_python_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Escape a string for use in double-quoted TypeScript literals
pub fn escape_ts_string(s: &str) -> String {
    escape_python_string(s)
}

/// Render a JSON value as a Python literal
pub fn python_literal(value: &serde_json::Value) -> String {
    use serde_json::Value;
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("\"{}\"", escape_python_string(s)),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(python_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("\"{}\": {}", escape_python_string(k), python_literal(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

/// Render a JSON value as a TypeScript literal
pub fn ts_literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => format!("\"{}\"", escape_ts_string(s)),
        other => other.to_string(),
    }
}

/// Generate a consistent color for an entity based on its name hash
pub fn entity_color(name: &str) -> &'static str {
    const COLORS: [&str; 8] = [
        "#3b82f6", // blue
        "#10b981", // green
        "#f59e0b", // amber
        "#ef4444", // red
        "#8b5cf6", // violet
        "#ec4899", // pink
        "#14b8a6", // teal
        "#f97316", // orange
    ];

    let digest = Sha256::digest(name.as_bytes());
    COLORS[digest[0] as usize % COLORS.len()]
}

/// Assign a default navigation icon to an entity based on name patterns
pub fn entity_icon(name: &str) -> &'static str {
    let name_lower = name.to_lowercase();

    if name_lower.contains("task") || name_lower.contains("todo") {
        "check-square"
    } else if name_lower.contains("project") || name_lower.contains("board") {
        "folder"
    } else if name_lower.contains("user") || name_lower.contains("member") || name_lower.contains("owner") {
        "user"
    } else if name_lower.contains("comment") || name_lower.contains("message") {
        "message-circle"
    } else if name_lower.contains("property") || name_lower.contains("building") {
        "home"
    } else if name_lower.contains("invoice") || name_lower.contains("payment") {
        "credit-card"
    } else if name_lower.contains("file") || name_lower.contains("document") {
        "file"
    } else {
        "list"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_conversions() {
        assert_eq!(to_snake_case("HelloWorld"), "hello_world");
        assert_eq!(to_pascal_case("hello_world"), "HelloWorld");
        assert_eq!(to_camel_case("hello_world"), "helloWorld");
        assert_eq!(to_screaming_snake_case("hello_world"), "HELLO_WORLD");
        assert_eq!(to_title_case("work_order"), "Work Order");
    }

    #[test]
    fn test_tokens_split_on_every_boundary() {
        assert_eq!(tokens("assignee_id"), vec!["assignee", "id"]);
        assert_eq!(tokens("AssigneeId"), vec!["assignee", "id"]);
        assert_eq!(tokens("due-date time"), vec!["due", "date", "time"]);
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("task"), "tasks");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("status"), "statuses");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("branch"), "branches");
        assert_eq!(pluralize("property"), "properties");
        assert_eq!(pluralize("work_order"), "work_orders");
    }

    #[test]
    fn test_python_literal() {
        assert_eq!(python_literal(&serde_json::json!(true)), "True");
        assert_eq!(python_literal(&serde_json::json!(null)), "None");
        assert_eq!(python_literal(&serde_json::json!("a\"b")), "\"a\\\"b\"");
        assert_eq!(python_literal(&serde_json::json!([1, "x"])), "[1, \"x\"]");
    }

    #[test]
    fn test_entity_color_consistency() {
        assert_eq!(entity_color("task"), entity_color("task"));
        assert!(entity_color("task").starts_with('#'));
    }

    #[test]
    fn test_entity_icon_patterns() {
        assert_eq!(entity_icon("task"), "check-square");
        assert_eq!(entity_icon("property"), "home");
        assert_eq!(entity_icon("widget"), "list");
    }
}
