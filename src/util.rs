use chrono::{DateTime, Utc};

/// Allocate a new record id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current timestamp. One call site per logical operation so a record's
/// fields share a single instant.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Sanitize an identifier for safe use in collection names.
/// Keeps alphanumeric and hyphens; replaces everything else with underscore.
pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Convert a display name to a URL-safe kebab-case slug.
///
/// Example: "Community Stories" → "community-stories"
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
